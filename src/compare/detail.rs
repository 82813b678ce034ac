//! Table detail builder
//!
//! Reconstructs the bilateral view of one table for one run purely from the
//! snapshot workspace, optionally computing the difference analysis. The
//! assembly itself is a pure function over pre-fetched parts.

use crate::compare::analysis::{compare_columns, compare_foreign_keys, compare_table_metadata};
use crate::error::EngineError;
use crate::models::{
    ColumnSnapshot, ColumnsPayload, DatabaseSide, ForeignKeySnapshot, ForeignKeysPayload,
    MetadataDrift, OrderedMap, TableDifference, TableMetadata,
};
use crate::snapshot::ComparisonStore;
use uuid::Uuid;

/// Everything captured for one table on one side
#[derive(Debug, Clone, Default)]
pub struct SideStructure {
    pub columns: OrderedMap<ColumnSnapshot>,
    pub metadata: Option<TableMetadata>,
    pub foreign_keys: OrderedMap<ForeignKeySnapshot>,
}

/// The three difference categories for one table
#[derive(Debug, Clone, Default)]
pub struct TableDifferences {
    pub metadata: MetadataDrift,
    pub columns: ColumnsPayload,
    pub foreign_keys: ForeignKeysPayload,
}

impl TableDifferences {
    pub fn any(&self) -> bool {
        !self.metadata.is_empty() || !self.columns.is_empty() || !self.foreign_keys.is_empty()
    }
}

/// The unified bilateral view of one table
#[derive(Debug, Clone)]
pub struct TableDetail {
    pub table_name: String,
    pub in_source: bool,
    pub in_target: bool,
    pub source: SideStructure,
    pub target: SideStructure,
    /// `None` when difference computation was skipped
    pub differences: Option<TableDifferences>,
    pub has_differences: bool,
}

impl TableDetail {
    /// The findings to persist for this table, one per non-empty category
    pub fn difference_payloads(&self, run_id: Uuid) -> Vec<TableDifference> {
        let mut payloads = Vec::new();

        if !self.in_source {
            payloads.push(TableDifference::missing_in_source(run_id, &self.table_name));
        }
        if !self.in_target {
            payloads.push(TableDifference::missing_in_target(run_id, &self.table_name));
        }

        if let Some(differences) = &self.differences {
            if !differences.metadata.is_empty() {
                payloads.push(TableDifference::metadata(
                    run_id,
                    &self.table_name,
                    differences.metadata.clone(),
                ));
            }
            if !differences.columns.is_empty() {
                payloads.push(TableDifference::columns(
                    run_id,
                    &self.table_name,
                    differences.columns.clone(),
                ));
            }
            if !differences.foreign_keys.is_empty() {
                payloads.push(TableDifference::foreign_keys(
                    run_id,
                    &self.table_name,
                    differences.foreign_keys.clone(),
                ));
            }
        }

        payloads
    }
}

/// Build the bilateral view of one table from the workspace.
///
/// With `compute_differences` unset only the raw structural view is
/// assembled and `has_differences` reflects presence alone; the difference
/// block stays `None`. Used when one view feeds several consumers and the
/// comparison cost is not wanted.
pub async fn build_table_detail(
    store: &ComparisonStore,
    run_id: Uuid,
    table_name: &str,
    compute_differences: bool,
) -> Result<TableDetail, EngineError> {
    let source = fetch_side(store, run_id, DatabaseSide::Source, table_name).await?;
    let target = fetch_side(store, run_id, DatabaseSide::Target, table_name).await?;

    Ok(assemble_detail(
        table_name,
        source,
        target,
        compute_differences,
    ))
}

async fn fetch_side(
    store: &ComparisonStore,
    run_id: Uuid,
    side: DatabaseSide,
    table_name: &str,
) -> Result<Option<SideStructure>, EngineError> {
    let snapshot = match store.table_snapshot(run_id, side, table_name).await? {
        Some(snapshot) => snapshot,
        None => return Ok(None),
    };

    let columns = store.columns(snapshot.id).await?;
    let foreign_keys = store.foreign_keys(snapshot.id).await?;

    Ok(Some(SideStructure {
        columns,
        metadata: Some(TableMetadata {
            engine: snapshot.engine,
            collation: snapshot.collation,
        }),
        foreign_keys,
    }))
}

/// Assemble the detail from pre-fetched per-side structure. A table absent
/// from either side short-circuits all three categories to empty: the
/// presence flag alone carries the finding, without manufacturing
/// column-by-column noise against an empty view.
pub fn assemble_detail(
    table_name: &str,
    source: Option<SideStructure>,
    target: Option<SideStructure>,
    compute_differences: bool,
) -> TableDetail {
    let in_source = source.is_some();
    let in_target = target.is_some();
    let source = source.unwrap_or_default();
    let target = target.unwrap_or_default();

    let mut has_differences = !in_source || !in_target;

    let differences = if compute_differences {
        let differences = if in_source && in_target {
            TableDifferences {
                metadata: compare_table_metadata(
                    source.metadata.as_ref(),
                    target.metadata.as_ref(),
                ),
                columns: compare_columns(&source.columns, &target.columns),
                foreign_keys: compare_foreign_keys(&source.foreign_keys, &target.foreign_keys),
            }
        } else {
            TableDifferences::default()
        };

        has_differences = has_differences || differences.any();
        Some(differences)
    } else {
        None
    };

    TableDetail {
        table_name: table_name.to_string(),
        in_source,
        in_target,
        source,
        target,
        differences,
        has_differences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

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

    #[test]
    fn test_identical_sides_have_no_differences() {
        let detail = assemble_detail(
            "users",
            Some(structure(vec![column("id", 1), column("name", 2)])),
            Some(structure(vec![column("id", 1), column("name", 2)])),
            true,
        );

        assert!(detail.in_source);
        assert!(detail.in_target);
        assert!(!detail.has_differences);
        assert!(detail.difference_payloads(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn test_source_only_table_short_circuits_categories() {
        let detail = assemble_detail(
            "orders",
            Some(structure(vec![column("id", 1), column("user_id", 2)])),
            None,
            true,
        );

        assert!(detail.in_source);
        assert!(!detail.in_target);
        assert!(detail.has_differences);

        let differences = detail.differences.as_ref().unwrap();
        assert!(differences.metadata.is_empty());
        assert!(differences.columns.is_empty());
        assert!(differences.foreign_keys.is_empty());

        let payloads = detail.difference_payloads(Uuid::new_v4());
        assert_eq!(payloads.len(), 1);
    }

    #[test]
    fn test_skipping_differences_keeps_presence_signal() {
        let detail = assemble_detail(
            "logs",
            None,
            Some(structure(vec![column("id", 1)])),
            false,
        );

        assert!(detail.differences.is_none());
        assert!(detail.has_differences);

        let detail = assemble_detail(
            "users",
            Some(structure(vec![column("id", 1)])),
            Some(structure(vec![column("id", 1)])),
            false,
        );
        assert!(detail.differences.is_none());
        assert!(!detail.has_differences);
    }

    #[test]
    fn test_shared_table_with_extra_target_column() {
        let detail = assemble_detail(
            "users",
            Some(structure(vec![column("id", 1), column("name", 2)])),
            Some(structure(vec![
                column("id", 1),
                column("name", 2),
                column("email", 3),
            ])),
            true,
        );

        assert!(detail.has_differences);
        let differences = detail.differences.as_ref().unwrap();
        assert_eq!(differences.columns.only_in_target, vec!["email".to_string()]);
        assert!(differences.columns.only_in_source.is_empty());
        assert!(differences.columns.modified.is_empty());
        assert!(differences.metadata.is_empty());

        let payloads = detail.difference_payloads(Uuid::new_v4());
        assert_eq!(payloads.len(), 1);
    }
}
