//! Live structure reader
//!
//! Reads schema facts from one live database connection: the table list,
//! per-table status metadata, ordered columns, and referential constraints.
//! Reads only; the engine never issues writes against a live side.

use crate::error::EngineError;
use crate::models::{
    natural_cmp, ColumnSnapshot, ForeignKeyColumn, ForeignKeySnapshot, TableStatus,
};
use deadpool_postgres::Client;

/// Tables visible on the connection's search path
const LIST_TABLES: &str = r#"
    SELECT c.relname AS table_name
    FROM pg_catalog.pg_class c
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE c.relkind IN ('r', 'p')
        AND n.nspname <> 'pg_catalog'
        AND n.nspname !~ '^pg_toast'
        AND n.nspname <> 'information_schema'
        AND pg_catalog.pg_table_is_visible(c.oid)
    ORDER BY c.relname
"#;

/// Status metadata for one table. The database-level collation stands in
/// for a per-table setting; the access method plays the engine role.
const TABLE_STATUS: &str = r#"
    SELECT
        am.amname AS engine,
        d.datcollate AS collation,
        pg_catalog.pg_get_userbyid(c.relowner) AS owner,
        c.reltuples::bigint AS row_estimate,
        CASE c.relpersistence
            WHEN 'p' THEN 'permanent'
            WHEN 'u' THEN 'unlogged'
            WHEN 't' THEN 'temporary'
        END AS persistence,
        ts.spcname AS tablespace,
        pg_catalog.obj_description(c.oid, 'pg_class') AS comment
    FROM pg_catalog.pg_class c
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN pg_catalog.pg_am am ON am.oid = c.relam
        LEFT JOIN pg_catalog.pg_tablespace ts ON ts.oid = c.reltablespace
        JOIN pg_catalog.pg_database d ON d.datname = pg_catalog.current_database()
    WHERE c.relname = $1
        AND c.relkind IN ('r', 'p')
        AND pg_catalog.pg_table_is_visible(c.oid)
    LIMIT 1
"#;

/// Full column definitions for one table, in attribute order. Collation is
/// reported only when it deviates from the type default, mirroring how the
/// server itself displays it.
const GET_COLUMNS: &str = r#"
    SELECT
        a.attname AS column_name,
        pg_catalog.format_type(a.atttypid, a.atttypmod) AS column_type,
        NOT a.attnotnull AS nullable,
        pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) AS column_default,
        co.collname AS collation,
        pg_catalog.col_description(a.attrelid, a.attnum) AS comment,
        CASE
            WHEN EXISTS (
                SELECT 1 FROM pg_catalog.pg_constraint pc
                WHERE pc.conrelid = a.attrelid
                    AND pc.contype = 'p'
                    AND a.attnum = ANY (pc.conkey)
            ) THEN 'PRI'
            WHEN EXISTS (
                SELECT 1 FROM pg_catalog.pg_constraint pc
                WHERE pc.conrelid = a.attrelid
                    AND pc.contype = 'u'
                    AND a.attnum = ANY (pc.conkey)
            ) THEN 'UNI'
            ELSE ''
        END AS key_role,
        CASE
            WHEN a.attidentity IN ('a', 'd') THEN 'identity'
            WHEN a.attgenerated = 's' THEN 'generated stored'
            ELSE ''
        END AS extra
    FROM pg_catalog.pg_attribute a
        JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
        JOIN pg_catalog.pg_type t ON t.oid = a.atttypid
        LEFT JOIN pg_catalog.pg_attrdef ad
            ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum
        LEFT JOIN pg_catalog.pg_collation co
            ON co.oid = a.attcollation AND a.attcollation <> t.typcollation
    WHERE c.relname = $1
        AND c.relkind IN ('r', 'p')
        AND pg_catalog.pg_table_is_visible(c.oid)
        AND a.attnum > 0
        AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

/// Referential constraints of one table with their ordered column mappings.
/// The referenced side is resolved through position_in_unique_constraint so
/// composite-key column order is exact.
const GET_FOREIGN_KEYS: &str = r#"
    SELECT
        rc.constraint_name,
        kcu.ordinal_position,
        kcu.column_name,
        rk.table_name AS referenced_table,
        rk.column_name AS referenced_column,
        rc.update_rule,
        rc.delete_rule
    FROM information_schema.referential_constraints rc
        JOIN information_schema.key_column_usage kcu
            ON kcu.constraint_name = rc.constraint_name
            AND kcu.constraint_schema = rc.constraint_schema
        JOIN information_schema.key_column_usage rk
            ON rk.constraint_name = rc.unique_constraint_name
            AND rk.constraint_schema = rc.unique_constraint_schema
            AND rk.ordinal_position = kcu.position_in_unique_constraint
    WHERE kcu.table_schema = $1
        AND kcu.table_name = $2
    ORDER BY rc.constraint_name, kcu.ordinal_position
"#;

/// Schema reader for PostgreSQL
pub struct SchemaReader;

impl SchemaReader {
    /// List table names, natural case-insensitive order
    pub async fn tables(client: &Client) -> Result<Vec<String>, EngineError> {
        let rows = client.query(LIST_TABLES, &[]).await?;

        let mut tables: Vec<String> = rows.iter().map(|row| row.get("table_name")).collect();
        tables.sort_by(|a, b| natural_cmp(a, b));

        Ok(tables)
    }

    /// Fetch status metadata for one table. Absent status is `None`, not an
    /// error; fields that cannot be read degrade to `None` individually.
    pub async fn table_status(
        client: &Client,
        table_name: &str,
    ) -> Result<Option<TableStatus>, EngineError> {
        let row = client.query_opt(TABLE_STATUS, &[&table_name]).await?;

        Ok(row.map(|row| TableStatus {
            engine: row.try_get("engine").ok().flatten(),
            collation: row.try_get("collation").ok().flatten(),
            owner: row.try_get("owner").ok().flatten(),
            row_estimate: row.try_get("row_estimate").ok().flatten(),
            persistence: row.try_get("persistence").ok().flatten(),
            tablespace: row.try_get("tablespace").ok().flatten(),
            comment: row.try_get("comment").ok().flatten(),
        }))
    }

    /// Fetch column definitions for one table in attribute order. Ordinal
    /// positions are assigned by the caller from iteration order.
    pub async fn columns(
        client: &Client,
        table_name: &str,
    ) -> Result<Vec<ColumnSnapshot>, EngineError> {
        let rows = client.query(GET_COLUMNS, &[&table_name]).await?;

        let columns = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let column_type: String = row.get("column_type");
                let data_type = normalize_base_type(&column_type);
                ColumnSnapshot {
                    name: row.get("column_name"),
                    ordinal_position: index as i32 + 1,
                    column_type,
                    data_type,
                    nullable: row.get("nullable"),
                    key_role: row.get("key_role"),
                    default: row.get("column_default"),
                    extra: row.get("extra"),
                    collation: row.get("collation"),
                    comment: row.get("comment"),
                }
            })
            .collect();

        Ok(columns)
    }

    /// Fetch foreign keys for one table, grouped by constraint name with
    /// column mappings in referential position order. Needs the schema
    /// name; callers skip this read when none is configured.
    pub async fn foreign_keys(
        client: &Client,
        schema: &str,
        table_name: &str,
    ) -> Result<Vec<ForeignKeySnapshot>, EngineError> {
        let rows = client
            .query(GET_FOREIGN_KEYS, &[&schema, &table_name])
            .await?;

        let mut foreign_keys: Vec<ForeignKeySnapshot> = Vec::new();

        for row in rows {
            let constraint_name: String = row.get("constraint_name");

            if foreign_keys.last().map(|fk| fk.name.as_str()) != Some(constraint_name.as_str()) {
                foreign_keys.push(ForeignKeySnapshot {
                    name: constraint_name,
                    update_rule: row.get("update_rule"),
                    delete_rule: row.get("delete_rule"),
                    columns: Vec::new(),
                });
            }

            foreign_keys
                .last_mut()
                .expect("group pushed above")
                .columns
                .push(ForeignKeyColumn {
                    position: row.get("ordinal_position"),
                    column: row.get("column_name"),
                    referenced_table: row.get("referenced_table"),
                    referenced_column: row.get("referenced_column"),
                });
        }

        Ok(foreign_keys)
    }
}

/// Strip any parenthesized length/precision suffix and lower-case the rest:
/// "character varying(255)" becomes "character varying".
pub fn normalize_base_type(column_type: &str) -> String {
    let base = match column_type.find('(') {
        Some(index) => &column_type[..index],
        None => column_type,
    };
    base.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_type_strips_suffix() {
        assert_eq!(
            normalize_base_type("character varying(255)"),
            "character varying"
        );
        assert_eq!(normalize_base_type("NUMERIC(10,2)"), "numeric");
    }

    #[test]
    fn test_normalize_base_type_passthrough() {
        assert_eq!(normalize_base_type("integer"), "integer");
        assert_eq!(normalize_base_type("TIMESTAMP WITH TIME ZONE"), "timestamp with time zone");
    }
}
