//! Snapshot capture
//!
//! Walks every table of one live database and persists its structure into
//! the snapshot workspace under a run id and side tag. Capture is
//! all-or-nothing per call: any read or write error propagates to the
//! orchestrator uncaught.

use crate::error::EngineError;
use crate::models::{natural_cmp, DatabaseSide};
use crate::reader::SchemaReader;
use crate::snapshot::store::ComparisonStore;
use deadpool_postgres::Pool;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

/// Capture every table of the database behind `pool` into the store.
///
/// Foreign-key capture needs a schema name; when none is configured the
/// side is captured without foreign keys rather than failing.
pub async fn capture_database_snapshot(
    pool: &Pool,
    store: &ComparisonStore,
    run_id: Uuid,
    side: DatabaseSide,
    schema: Option<&str>,
) -> Result<(), EngineError> {
    let client = pool.get().await?;

    let tables = SchemaReader::tables(&client).await?;
    if tables.is_empty() {
        debug!("No tables on {} side; nothing to capture", side);
        return Ok(());
    }

    if schema.is_none() {
        // Without a schema name the referential-constraint query cannot be
        // scoped, so this side will report no foreign keys at all. That can
        // surface as foreign-key differences against a fully captured side.
        warn!(
            "No schema name configured for {} side; skipping foreign-key capture",
            side
        );
    }

    for table_name in &tables {
        let status = SchemaReader::table_status(&client, table_name).await?;
        let metadata_json = status.as_ref().map(|s| serde_json::to_value(s).unwrap_or_default());
        let checksum = metadata_json.as_ref().map(|json| checksum_of(json));

        let (engine, collation) = match &status {
            Some(status) => (status.engine.as_deref(), status.collation.as_deref()),
            None => (None, None),
        };

        let snapshot_id = store
            .insert_table_snapshot(
                run_id,
                side,
                table_name,
                engine,
                collation,
                checksum.as_deref(),
                metadata_json.as_ref(),
            )
            .await?;

        let columns = SchemaReader::columns(&client, table_name).await?;
        store.insert_column_snapshots(snapshot_id, &columns).await?;

        if let Some(schema) = schema {
            let mut foreign_keys = SchemaReader::foreign_keys(&client, schema, table_name).await?;
            foreign_keys.sort_by(|a, b| natural_cmp(&a.name, &b.name));

            for foreign_key in &foreign_keys {
                store.insert_foreign_key(snapshot_id, foreign_key).await?;
            }
        }

        debug!(
            "Captured {} side table {} ({} columns)",
            side,
            table_name,
            columns.len()
        );
    }

    Ok(())
}

/// SHA-256 over the serialized status payload, lower-hex. Lets equality be
/// checked later without re-reading the live side.
fn checksum_of(metadata_json: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(metadata_json.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableStatus;

    fn sample_status() -> TableStatus {
        TableStatus {
            engine: Some("heap".to_string()),
            collation: Some("en_US.utf8".to_string()),
            owner: Some("app".to_string()),
            row_estimate: Some(42),
            persistence: Some("permanent".to_string()),
            tablespace: None,
            comment: None,
        }
    }

    #[test]
    fn test_checksum_is_deterministic() {
        let json = serde_json::to_value(sample_status()).unwrap();
        assert_eq!(checksum_of(&json), checksum_of(&json));
        assert_eq!(checksum_of(&json).len(), 64);
    }

    #[test]
    fn test_checksum_tracks_content() {
        let json_a = serde_json::to_value(sample_status()).unwrap();

        let mut changed = sample_status();
        changed.engine = Some("columnar".to_string());
        let json_b = serde_json::to_value(changed).unwrap();

        assert_ne!(checksum_of(&json_a), checksum_of(&json_b));
    }
}
