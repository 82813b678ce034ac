//! Snapshot workspace store
//!
//! One reusable PostgreSQL workspace holding everything a comparison run
//! produces: run rows, per-side table/column/foreign-key snapshots, the
//! resulting differences, and drafted SQL. The workspace is wiped at the
//! start of each run; history across runs is not retained.

use crate::error::EngineError;
use crate::models::{
    natural_cmp, ColumnSnapshot, ComparisonRun, DatabaseSide, ForeignKeyColumn,
    ForeignKeySnapshot, GeneratedSql, OrderedMap, RunStatus, TableDifference,
};
use chrono::Utc;
use deadpool_postgres::Pool;
use tracing::{debug, info};
use uuid::Uuid;

/// A table snapshot header as read back from the workspace
#[derive(Debug, Clone)]
pub struct StoredTableSnapshot {
    pub id: Uuid,
    pub engine: Option<String>,
    pub collation: Option<String>,
}

/// Store for one comparison workspace
pub struct ComparisonStore {
    pool: Pool,
}

impl ComparisonStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the workspace tables if they do not exist
    pub async fn ensure_schema(&self) -> Result<(), EngineError> {
        let client = self.pool.get().await?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS comparison_runs (
                    id UUID PRIMARY KEY,
                    source_label VARCHAR(255) NOT NULL,
                    target_label VARCHAR(255) NOT NULL,
                    source_database VARCHAR(255) NOT NULL,
                    target_database VARCHAR(255) NOT NULL,
                    status VARCHAR(16) NOT NULL DEFAULT 'running',
                    error_message TEXT,
                    started_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    completed_at TIMESTAMPTZ
                )",
                &[],
            )
            .await?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS table_snapshots (
                    id UUID PRIMARY KEY,
                    run_id UUID NOT NULL REFERENCES comparison_runs(id),
                    database_side VARCHAR(6) NOT NULL,
                    table_name VARCHAR(255) NOT NULL,
                    engine VARCHAR(64),
                    collation VARCHAR(64),
                    checksum VARCHAR(64),
                    metadata_json JSONB,
                    UNIQUE (run_id, database_side, table_name)
                )",
                &[],
            )
            .await?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS column_snapshots (
                    table_snapshot_id UUID NOT NULL REFERENCES table_snapshots(id),
                    column_name VARCHAR(255) NOT NULL,
                    ordinal_position INTEGER NOT NULL,
                    column_type TEXT NOT NULL,
                    data_type TEXT NOT NULL,
                    is_nullable BOOLEAN NOT NULL,
                    column_key VARCHAR(16) NOT NULL,
                    column_default TEXT,
                    extra VARCHAR(255) NOT NULL,
                    collation VARCHAR(64),
                    comment TEXT,
                    PRIMARY KEY (table_snapshot_id, column_name)
                )",
                &[],
            )
            .await?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS foreign_key_snapshots (
                    id UUID PRIMARY KEY,
                    table_snapshot_id UUID NOT NULL REFERENCES table_snapshots(id),
                    constraint_name VARCHAR(255) NOT NULL,
                    update_rule VARCHAR(32) NOT NULL,
                    delete_rule VARCHAR(32) NOT NULL,
                    UNIQUE (table_snapshot_id, constraint_name)
                )",
                &[],
            )
            .await?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS foreign_key_columns (
                    foreign_key_id UUID NOT NULL REFERENCES foreign_key_snapshots(id),
                    position INTEGER NOT NULL,
                    column_name VARCHAR(255) NOT NULL,
                    referenced_table VARCHAR(255) NOT NULL,
                    referenced_column VARCHAR(255) NOT NULL,
                    PRIMARY KEY (foreign_key_id, position)
                )",
                &[],
            )
            .await?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS table_differences (
                    id UUID PRIMARY KEY,
                    run_id UUID NOT NULL REFERENCES comparison_runs(id),
                    table_name VARCHAR(255) NOT NULL,
                    difference_kind VARCHAR(32) NOT NULL,
                    database_side VARCHAR(6) NOT NULL,
                    payload JSONB NOT NULL,
                    UNIQUE (run_id, table_name, difference_kind)
                )",
                &[],
            )
            .await?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS generated_sql (
                    run_id UUID NOT NULL REFERENCES comparison_runs(id),
                    table_name VARCHAR(255) NOT NULL,
                    statements TEXT NOT NULL,
                    model_name VARCHAR(128) NOT NULL,
                    generated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    PRIMARY KEY (run_id, table_name)
                )",
                &[],
            )
            .await?;

        info!("Snapshot workspace schema ready");
        Ok(())
    }

    /// Wipe every row from prior runs. A single multi-table TRUNCATE keeps
    /// referential dependencies satisfied without disabling them.
    pub async fn reset(&self) -> Result<(), EngineError> {
        let client = self.pool.get().await?;

        client
            .execute(
                "TRUNCATE TABLE generated_sql,
                    table_differences,
                    foreign_key_columns,
                    foreign_key_snapshots,
                    column_snapshots,
                    table_snapshots,
                    comparison_runs",
                &[],
            )
            .await?;

        debug!("Snapshot workspace reset");
        Ok(())
    }

    /// Create a new run in `running` state
    pub async fn create_run(
        &self,
        source_label: &str,
        target_label: &str,
        source_database: &str,
        target_database: &str,
    ) -> Result<ComparisonRun, EngineError> {
        let client = self.pool.get().await?;

        let run = ComparisonRun {
            id: Uuid::new_v4(),
            source_label: source_label.to_string(),
            target_label: target_label.to_string(),
            source_database: source_database.to_string(),
            target_database: target_database.to_string(),
            status: RunStatus::Running,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        };

        client
            .execute(
                "INSERT INTO comparison_runs
                    (id, source_label, target_label, source_database, target_database, status, started_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &run.id,
                    &run.source_label,
                    &run.target_label,
                    &run.source_database,
                    &run.target_database,
                    &run.status.as_str(),
                    &run.started_at,
                ],
            )
            .await?;

        info!("Created comparison run {}", run.id);
        Ok(run)
    }

    /// Record the successful terminal state
    pub async fn mark_run_completed(&self, run_id: Uuid) -> Result<(), EngineError> {
        let client = self.pool.get().await?;

        client
            .execute(
                "UPDATE comparison_runs
                 SET status = 'completed', completed_at = CURRENT_TIMESTAMP
                 WHERE id = $1",
                &[&run_id],
            )
            .await?;

        Ok(())
    }

    /// Record the failed terminal state with the propagated error text
    pub async fn mark_run_failed(&self, run_id: Uuid, error_message: &str) -> Result<(), EngineError> {
        let client = self.pool.get().await?;

        client
            .execute(
                "UPDATE comparison_runs
                 SET status = 'failed', completed_at = CURRENT_TIMESTAMP, error_message = $2
                 WHERE id = $1",
                &[&run_id, &error_message],
            )
            .await?;

        Ok(())
    }

    /// Persist one captured table's identity and metadata, returning the
    /// snapshot id the column and foreign-key rows hang off
    pub async fn insert_table_snapshot(
        &self,
        run_id: Uuid,
        side: DatabaseSide,
        table_name: &str,
        engine: Option<&str>,
        collation: Option<&str>,
        checksum: Option<&str>,
        metadata_json: Option<&serde_json::Value>,
    ) -> Result<Uuid, EngineError> {
        let client = self.pool.get().await?;
        let id = Uuid::new_v4();

        client
            .execute(
                "INSERT INTO table_snapshots
                    (id, run_id, database_side, table_name, engine, collation, checksum, metadata_json)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &id,
                    &run_id,
                    &side.as_str(),
                    &table_name,
                    &engine,
                    &collation,
                    &checksum,
                    &metadata_json,
                ],
            )
            .await?;

        Ok(id)
    }

    /// Persist the ordered columns of one table snapshot
    pub async fn insert_column_snapshots(
        &self,
        table_snapshot_id: Uuid,
        columns: &[ColumnSnapshot],
    ) -> Result<(), EngineError> {
        let client = self.pool.get().await?;

        let statement = client
            .prepare_cached(
                "INSERT INTO column_snapshots
                    (table_snapshot_id, column_name, ordinal_position, column_type, data_type,
                     is_nullable, column_key, column_default, extra, collation, comment)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .await?;

        for column in columns {
            client
                .execute(
                    &statement,
                    &[
                        &table_snapshot_id,
                        &column.name,
                        &column.ordinal_position,
                        &column.column_type,
                        &column.data_type,
                        &column.nullable,
                        &column.key_role,
                        &column.default,
                        &column.extra,
                        &column.collation,
                        &column.comment,
                    ],
                )
                .await?;
        }

        Ok(())
    }

    /// Persist one foreign key with its ordered column mappings
    pub async fn insert_foreign_key(
        &self,
        table_snapshot_id: Uuid,
        foreign_key: &ForeignKeySnapshot,
    ) -> Result<(), EngineError> {
        let client = self.pool.get().await?;
        let id = Uuid::new_v4();

        client
            .execute(
                "INSERT INTO foreign_key_snapshots
                    (id, table_snapshot_id, constraint_name, update_rule, delete_rule)
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &id,
                    &table_snapshot_id,
                    &foreign_key.name,
                    &foreign_key.update_rule,
                    &foreign_key.delete_rule,
                ],
            )
            .await?;

        let statement = client
            .prepare_cached(
                "INSERT INTO foreign_key_columns
                    (foreign_key_id, position, column_name, referenced_table, referenced_column)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .await?;

        for column in &foreign_key.columns {
            client
                .execute(
                    &statement,
                    &[
                        &id,
                        &column.position,
                        &column.column,
                        &column.referenced_table,
                        &column.referenced_column,
                    ],
                )
                .await?;
        }

        Ok(())
    }

    /// Table names captured for one side, natural case-insensitive order
    pub async fn table_names(
        &self,
        run_id: Uuid,
        side: DatabaseSide,
    ) -> Result<Vec<String>, EngineError> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                "SELECT table_name FROM table_snapshots
                 WHERE run_id = $1 AND database_side = $2",
                &[&run_id, &side.as_str()],
            )
            .await?;

        let mut tables: Vec<String> = rows.iter().map(|row| row.get("table_name")).collect();
        tables.sort_by(|a, b| natural_cmp(a, b));

        Ok(tables)
    }

    /// Union of table names captured on either side, natural
    /// case-insensitive order
    pub async fn all_table_names(&self, run_id: Uuid) -> Result<Vec<String>, EngineError> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                "SELECT DISTINCT table_name FROM table_snapshots WHERE run_id = $1",
                &[&run_id],
            )
            .await?;

        let mut tables: Vec<String> = rows.iter().map(|row| row.get("table_name")).collect();
        tables.sort_by(|a, b| natural_cmp(a, b));

        Ok(tables)
    }

    /// Look up one side's snapshot of a table; absence defines the
    /// presence flag in table detail
    pub async fn table_snapshot(
        &self,
        run_id: Uuid,
        side: DatabaseSide,
        table_name: &str,
    ) -> Result<Option<StoredTableSnapshot>, EngineError> {
        let client = self.pool.get().await?;

        let row = client
            .query_opt(
                "SELECT id, engine, collation FROM table_snapshots
                 WHERE run_id = $1 AND database_side = $2 AND table_name = $3
                 LIMIT 1",
                &[&run_id, &side.as_str(), &table_name],
            )
            .await?;

        Ok(row.map(|row| StoredTableSnapshot {
            id: row.get("id"),
            engine: row.get("engine"),
            collation: row.get("collation"),
        }))
    }

    /// Columns of one snapshot, keyed by name, insertion order following
    /// ordinal position
    pub async fn columns(
        &self,
        table_snapshot_id: Uuid,
    ) -> Result<OrderedMap<ColumnSnapshot>, EngineError> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                "SELECT column_name, ordinal_position, column_type, data_type, is_nullable,
                        column_key, column_default, extra, collation, comment
                 FROM column_snapshots
                 WHERE table_snapshot_id = $1
                 ORDER BY ordinal_position",
                &[&table_snapshot_id],
            )
            .await?;

        let columns = rows
            .iter()
            .map(|row| {
                let column = ColumnSnapshot {
                    name: row.get("column_name"),
                    ordinal_position: row.get("ordinal_position"),
                    column_type: row.get("column_type"),
                    data_type: row.get("data_type"),
                    nullable: row.get("is_nullable"),
                    key_role: row.get("column_key"),
                    default: row.get("column_default"),
                    extra: row.get("extra"),
                    collation: row.get("collation"),
                    comment: row.get("comment"),
                };
                (column.name.clone(), column)
            })
            .collect();

        Ok(columns)
    }

    /// Foreign keys of one snapshot, keyed by constraint name in natural
    /// case-insensitive order, column mappings sorted by position
    pub async fn foreign_keys(
        &self,
        table_snapshot_id: Uuid,
    ) -> Result<OrderedMap<ForeignKeySnapshot>, EngineError> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                "SELECT fks.constraint_name, fks.update_rule, fks.delete_rule,
                        fkc.position, fkc.column_name, fkc.referenced_table, fkc.referenced_column
                 FROM foreign_key_snapshots fks
                     LEFT JOIN foreign_key_columns fkc ON fkc.foreign_key_id = fks.id
                 WHERE fks.table_snapshot_id = $1
                 ORDER BY fks.constraint_name, fkc.position",
                &[&table_snapshot_id],
            )
            .await?;

        let mut foreign_keys: OrderedMap<ForeignKeySnapshot> = OrderedMap::new();

        for row in rows {
            let name: String = row.get("constraint_name");

            if !foreign_keys.contains_key(&name) {
                foreign_keys.insert(
                    name.clone(),
                    ForeignKeySnapshot {
                        name: name.clone(),
                        update_rule: row.get("update_rule"),
                        delete_rule: row.get("delete_rule"),
                        columns: Vec::new(),
                    },
                );
            }

            let position: Option<i32> = row.get("position");
            if let (Some(position), Some(fk)) = (position, foreign_keys.get_mut(&name)) {
                fk.columns.push(ForeignKeyColumn {
                    position,
                    column: row.get("column_name"),
                    referenced_table: row.get("referenced_table"),
                    referenced_column: row.get("referenced_column"),
                });
            }
        }

        for (_, fk) in foreign_keys.iter_mut() {
            fk.columns.sort_by_key(|column| column.position);
        }
        foreign_keys.sort_by_natural_key();

        Ok(foreign_keys)
    }

    /// Persist findings for one table, one row per kind
    pub async fn insert_differences(
        &self,
        differences: &[TableDifference],
    ) -> Result<(), EngineError> {
        if differences.is_empty() {
            return Ok(());
        }

        let client = self.pool.get().await?;

        let statement = client
            .prepare_cached(
                "INSERT INTO table_differences
                    (id, run_id, table_name, difference_kind, database_side, payload)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .await?;

        for difference in differences {
            let payload = serde_json::to_value(&difference.payload).unwrap_or_default();

            client
                .execute(
                    &statement,
                    &[
                        &Uuid::new_v4(),
                        &difference.run_id,
                        &difference.table_name,
                        &difference.kind.as_str(),
                        &difference.side.as_str(),
                        &payload,
                    ],
                )
                .await?;
        }

        Ok(())
    }

    /// Tables with at least one recorded difference, natural
    /// case-insensitive order
    pub async fn differing_tables(&self, run_id: Uuid) -> Result<Vec<String>, EngineError> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                "SELECT DISTINCT table_name FROM table_differences WHERE run_id = $1",
                &[&run_id],
            )
            .await?;

        let mut tables: Vec<String> = rows.iter().map(|row| row.get("table_name")).collect();
        tables.sort_by(|a, b| natural_cmp(a, b));

        Ok(tables)
    }

    /// Upsert drafted SQL for one table; regeneration replaces the
    /// previous draft
    pub async fn upsert_generated_sql(
        &self,
        run_id: Uuid,
        table_name: &str,
        model_name: &str,
        statements: &str,
    ) -> Result<(), EngineError> {
        let client = self.pool.get().await?;

        client
            .execute(
                "INSERT INTO generated_sql (run_id, table_name, statements, model_name)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (run_id, table_name) DO UPDATE
                 SET statements = EXCLUDED.statements,
                     model_name = EXCLUDED.model_name,
                     generated_at = CURRENT_TIMESTAMP",
                &[&run_id, &table_name, &statements, &model_name],
            )
            .await?;

        Ok(())
    }

    /// Previously drafted SQL for one table, if any
    pub async fn generated_sql(
        &self,
        run_id: Uuid,
        table_name: &str,
    ) -> Result<Option<GeneratedSql>, EngineError> {
        let client = self.pool.get().await?;

        let row = client
            .query_opt(
                "SELECT statements, model_name, generated_at FROM generated_sql
                 WHERE run_id = $1 AND table_name = $2
                 LIMIT 1",
                &[&run_id, &table_name],
            )
            .await?;

        Ok(row.map(|row| GeneratedSql {
            run_id,
            table_name: table_name.to_string(),
            statements: row.get("statements"),
            model_name: row.get("model_name"),
            generated_at: row.get("generated_at"),
        }))
    }
}
