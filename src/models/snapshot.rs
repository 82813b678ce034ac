//! Captured structure models
//!
//! These are the shapes persisted into the snapshot workspace during capture
//! and reconstructed from it when building table detail. They carry raw
//! values as reported by the live database; absent values stay `None` and
//! are never collapsed into empty strings.

use serde::{Deserialize, Serialize};

/// Table status metadata as reported by the live side at capture time.
/// Every field is optional: a table with no visible status row is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStatus {
    pub engine: Option<String>,
    pub collation: Option<String>,
    pub owner: Option<String>,
    pub row_estimate: Option<i64>,
    pub persistence: Option<String>,
    pub tablespace: Option<String>,
    pub comment: Option<String>,
}

/// The table-level attributes that participate in metadata comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub engine: Option<String>,
    pub collation: Option<String>,
}

/// One column of one table snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSnapshot {
    pub name: String,
    /// 1-based, contiguous within a snapshot; defines iteration order
    pub ordinal_position: i32,
    /// Declared type string, e.g. "character varying(255)"
    pub column_type: String,
    /// Declared type with any parenthesized suffix stripped, lower-cased
    pub data_type: String,
    pub nullable: bool,
    /// "PRI", "UNI" or empty
    pub key_role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub extra: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// One named referential constraint and its ordered column mappings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeySnapshot {
    pub name: String,
    pub update_rule: String,
    pub delete_rule: String,
    /// Ordered by position; for composite keys this order is part of the
    /// constraint's identity
    pub columns: Vec<ForeignKeyColumn>,
}

/// One column mapping of a foreign key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyColumn {
    pub position: i32,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}
