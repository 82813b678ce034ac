//! Corrective-SQL drafting
//!
//! Feeds each differing table's bilateral view to the drafting model and
//! persists the result. This sits downstream of the comparison: a drafting
//! failure never fails the run, it is recorded as an SQL comment instead.

pub mod client;
pub mod prompt;

pub use client::ClaudeDrafter;

use crate::compare::{build_table_detail, missing_from};
use crate::error::EngineError;
use crate::models::{ComparisonRun, DatabaseSide};
use crate::snapshot::ComparisonStore;
use tracing::{debug, info, warn};

/// Draft SQL for every differing table of a run that has none stored yet.
/// Returns how many tables were drafted.
pub async fn draft_sql_for_run(
    store: &ComparisonStore,
    drafter: &ClaudeDrafter,
    run: &ComparisonRun,
) -> Result<usize, EngineError> {
    let differing = store.differing_tables(run.id).await?;
    if differing.is_empty() {
        info!("Run {} has no differing tables; nothing to draft", run.id);
        return Ok(0);
    }

    let full_context = build_full_context(store, run).await?;
    let mut drafted = 0;

    for table_name in &differing {
        if store.generated_sql(run.id, table_name).await?.is_some() {
            debug!("SQL already drafted for {}; skipping", table_name);
            continue;
        }

        let detail = build_table_detail(store, run.id, table_name, true).await?;
        let prompt_text = prompt::table_prompt(
            table_name,
            &detail,
            &run.source_label,
            &run.target_label,
            &full_context,
        );

        let statements = match drafter.draft(&prompt_text).await {
            Ok(statements) => statements,
            Err(err) => {
                warn!("Drafting failed for {}: {}", table_name, err);
                format!("-- Error: unable to draft SQL ({})", err)
            }
        };

        store
            .upsert_generated_sql(run.id, table_name, drafter.model(), &statements)
            .await?;
        drafted += 1;
    }

    info!("Drafted SQL for {} of {} differing tables", drafted, differing.len());
    Ok(drafted)
}

/// Assemble the shared run context: the overview plus every table's
/// bilateral structure, built without paying the comparison cost.
async fn build_full_context(
    store: &ComparisonStore,
    run: &ComparisonRun,
) -> Result<String, EngineError> {
    let source_tables = store.table_names(run.id, DatabaseSide::Source).await?;
    let target_tables = store.table_names(run.id, DatabaseSide::Target).await?;
    let only_in_source = missing_from(&source_tables, &target_tables);
    let only_in_target = missing_from(&target_tables, &source_tables);

    let mut sections = Vec::new();
    for table_name in store.all_table_names(run.id).await? {
        let detail = build_table_detail(store, run.id, &table_name, false).await?;
        sections.push(prompt::context_section(
            &detail,
            &run.source_label,
            &run.target_label,
        ));
    }

    Ok(prompt::full_context(
        run,
        &source_tables,
        &target_tables,
        &only_in_source,
        &only_in_target,
        &sections,
    ))
}
