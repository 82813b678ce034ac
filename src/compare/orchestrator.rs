//! Comparison orchestrator
//!
//! Drives one full run: wipe the workspace, create the run row, capture
//! both sides, diff every table in the union, persist findings, and record
//! the terminal state. A run moves `running -> completed` or
//! `running -> failed` and never leaves a terminal state.

use crate::compare::detail::build_table_detail;
use crate::config::SideConfig;
use crate::error::EngineError;
use crate::models::{ComparisonRun, DatabaseSide, RunStatus};
use crate::snapshot::{capture_database_snapshot, ComparisonStore};
use chrono::Utc;
use deadpool_postgres::Pool;
use tracing::{error, info};

/// Summary of one finished run
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub run: ComparisonRun,
    pub source_tables: Vec<String>,
    pub target_tables: Vec<String>,
    pub only_in_source: Vec<String>,
    pub only_in_target: Vec<String>,
    pub tables_compared: usize,
    pub tables_with_differences: Vec<String>,
}

/// Run a full comparison of the two live sides into the store.
///
/// The workspace is wiped first; re-running produces a fresh run id with
/// its own complete result set. Any error during capture or diffing marks
/// the run `failed` with the error's message and then propagates.
pub async fn run_comparison(
    store: &ComparisonStore,
    source_pool: &Pool,
    source: &SideConfig,
    target_pool: &Pool,
    target: &SideConfig,
) -> Result<ComparisonOutcome, EngineError> {
    store.reset().await?;

    let mut run = store
        .create_run(
            &source.label,
            &target.label,
            &source.database.database,
            &target.database.database,
        )
        .await?;

    match execute(store, &run, source_pool, source, target_pool, target).await {
        Ok(mut outcome) => {
            store.mark_run_completed(run.id).await?;
            run.status = RunStatus::Completed;
            run.completed_at = Some(Utc::now());
            outcome.run = run;

            info!(
                "Comparison run {} completed: {} tables compared, {} with differences",
                outcome.run.id,
                outcome.tables_compared,
                outcome.tables_with_differences.len()
            );
            Ok(outcome)
        }
        Err(err) => {
            let message = err.to_string();
            error!("Comparison run {} failed: {}", run.id, message);

            if let Err(mark_err) = store.mark_run_failed(run.id, &message).await {
                error!(
                    "Could not record failed state for run {}: {}",
                    run.id, mark_err
                );
            }

            Err(err)
        }
    }
}

async fn execute(
    store: &ComparisonStore,
    run: &ComparisonRun,
    source_pool: &Pool,
    source: &SideConfig,
    target_pool: &Pool,
    target: &SideConfig,
) -> Result<ComparisonOutcome, EngineError> {
    capture_database_snapshot(
        source_pool,
        store,
        run.id,
        DatabaseSide::Source,
        source.schema.as_deref(),
    )
    .await?;

    capture_database_snapshot(
        target_pool,
        store,
        run.id,
        DatabaseSide::Target,
        target.schema.as_deref(),
    )
    .await?;

    let source_tables = store.table_names(run.id, DatabaseSide::Source).await?;
    let target_tables = store.table_names(run.id, DatabaseSide::Target).await?;

    let only_in_source = missing_from(&source_tables, &target_tables);
    let only_in_target = missing_from(&target_tables, &source_tables);

    // The union, not either side's list, is the iteration domain
    let all_tables = store.all_table_names(run.id).await?;
    let mut tables_with_differences = Vec::new();

    for table_name in &all_tables {
        let detail = build_table_detail(store, run.id, table_name, true).await?;

        if detail.has_differences {
            store
                .insert_differences(&detail.difference_payloads(run.id))
                .await?;
            tables_with_differences.push(table_name.clone());
        }
    }

    Ok(ComparisonOutcome {
        run: run.clone(),
        source_tables,
        target_tables,
        only_in_source,
        only_in_target,
        tables_compared: all_tables.len(),
        tables_with_differences,
    })
}

/// Entries of `from` that are absent in `other`, keeping `from`'s order
pub fn missing_from(from: &[String], other: &[String]) -> Vec<String> {
    from.iter()
        .filter(|name| !other.contains(name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::detail::{assemble_detail, SideStructure};
    use crate::models::{natural_cmp, ColumnSnapshot, DifferenceKind, OrderedMap, TableMetadata};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[test]
    fn test_missing_from_keeps_order() {
        let from = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let other = vec!["b".to_string()];

        assert_eq!(
            missing_from(&from, &other),
            vec!["a".to_string(), "c".to_string()]
        );
        assert!(missing_from(&other, &other).is_empty());
    }

    fn column(name: &str, position: i32) -> ColumnSnapshot {
        ColumnSnapshot {
            name: name.to_string(),
            ordinal_position: position,
            column_type: "integer".to_string(),
            data_type: "integer".to_string(),
            nullable: false,
            key_role: String::new(),
            default: None,
            extra: String::new(),
            collation: None,
            comment: None,
        }
    }

    fn structure(columns: Vec<ColumnSnapshot>) -> SideStructure {
        SideStructure {
            columns: columns.into_iter().map(|c| (c.name.clone(), c)).collect(),
            metadata: Some(TableMetadata {
                engine: Some("heap".to_string()),
                collation: Some("C".to_string()),
            }),
            foreign_keys: OrderedMap::new(),
        }
    }

    // Walks the diffing phase over a fixed capture result: the source has
    // users(id, name) and orders(id, user_id); the target has
    // users(id, name, email) and an extra logs table.
    #[test]
    fn test_two_sided_scenario_findings() {
        let run_id = Uuid::new_v4();

        let source_tables = vec!["orders".to_string(), "users".to_string()];
        let target_tables = vec!["logs".to_string(), "users".to_string()];

        assert_eq!(
            missing_from(&source_tables, &target_tables),
            vec!["orders".to_string()]
        );
        assert_eq!(
            missing_from(&target_tables, &source_tables),
            vec!["logs".to_string()]
        );

        let mut union: Vec<String> = source_tables
            .iter()
            .chain(target_tables.iter())
            .cloned()
            .collect();
        union.sort_by(|a, b| natural_cmp(a, b));
        union.dedup();
        assert_eq!(union, vec!["logs", "orders", "users"]);

        let sides = |table: &str| match table {
            "orders" => (
                Some(structure(vec![column("id", 1), column("user_id", 2)])),
                None,
            ),
            "logs" => (None, Some(structure(vec![column("id", 1)]))),
            _ => (
                Some(structure(vec![column("id", 1), column("name", 2)])),
                Some(structure(vec![
                    column("id", 1),
                    column("name", 2),
                    column("email", 3),
                ])),
            ),
        };

        let mut differing = Vec::new();
        for table in &union {
            let (source, target) = sides(table);
            let detail = assemble_detail(table, source, target, true);
            if detail.has_differences {
                differing.push((table.clone(), detail.difference_payloads(run_id)));
            }
        }

        assert_eq!(differing.len(), 3);

        let (_, logs) = &differing[0];
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].kind, DifferenceKind::MissingInSource);

        let (_, orders) = &differing[1];
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].kind, DifferenceKind::MissingInTarget);

        let (_, users) = &differing[2];
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].kind, DifferenceKind::Columns);
    }
}
