//! SchemaDrift - schema comparison engine
//!
//! Compares the structure of two live databases and records every
//! divergence: tables present on only one side, column definition
//! mismatches, table-level metadata mismatches, and foreign-key
//! differences. Findings land in a reusable snapshot workspace, and each
//! differing table can have corrective SQL drafted for it.
//!
//! PIPELINE: capture both sides into the workspace, diff the union of
//! tables, persist one finding per category per table, then optionally
//! draft SQL per differing table.

mod compare;
mod config;
mod db;
mod error;
mod models;
mod reader;
mod snapshot;
mod sqlgen;

use crate::config::Settings;
use crate::snapshot::ComparisonStore;
use crate::sqlgen::ClaudeDrafter;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("Starting SchemaDrift - schema comparison engine...");

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Comparing {} ({}) against {} ({})",
        settings.source.label,
        settings.source.database.database,
        settings.target.label,
        settings.target.database.database
    );

    // Snapshot workspace
    let storage_pool = db::create_pool(&settings.storage)?;
    db::ping(&storage_pool, "storage").await?;
    let store = ComparisonStore::new(storage_pool);
    store.ensure_schema().await?;

    // Live sides (read-only)
    let source_pool = db::create_pool(&settings.source.database)?;
    db::ping(&source_pool, "source").await?;
    let target_pool = db::create_pool(&settings.target.database)?;
    db::ping(&target_pool, "target").await?;

    let outcome = compare::run_comparison(
        &store,
        &source_pool,
        &settings.source,
        &target_pool,
        &settings.target,
    )
    .await?;

    info!("Run id: {}", outcome.run.id);
    info!(
        "{}: {} tables, {}: {} tables",
        outcome.run.source_label,
        outcome.source_tables.len(),
        outcome.run.target_label,
        outcome.target_tables.len()
    );
    if !outcome.only_in_source.is_empty() {
        info!(
            "Tables only in {}: {}",
            outcome.run.source_label,
            outcome.only_in_source.join(", ")
        );
    }
    if !outcome.only_in_target.is_empty() {
        info!(
            "Tables only in {}: {}",
            outcome.run.target_label,
            outcome.only_in_target.join(", ")
        );
    }
    if outcome.tables_with_differences.is_empty() {
        info!("No structural differences found; no changes needed");
    } else {
        info!(
            "{} of {} tables differ: {}",
            outcome.tables_with_differences.len(),
            outcome.tables_compared,
            outcome.tables_with_differences.join(", ")
        );
    }

    // Draft corrective SQL when a key is configured
    match &settings.drafting.api_key {
        Some(api_key) => {
            let drafter = ClaudeDrafter::new(api_key.as_str(), settings.drafting.model.as_str());
            let drafted = sqlgen::draft_sql_for_run(&store, &drafter, &outcome.run).await?;
            info!("SQL drafting finished ({} tables)", drafted);
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; skipping SQL drafting");
        }
    }

    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,schemadrift=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .compact(),
        )
        .init();
}
