//! Difference models
//!
//! A persisted finding is one row per (run, table, kind), with a
//! strongly-typed payload per kind. Field-level differences of the same
//! kind are aggregated into a single payload, never one row per field.

use crate::models::ordered::OrderedMap;
use crate::models::snapshot::ForeignKeySnapshot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The categories a table difference can fall into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    MissingInSource,
    MissingInTarget,
    Metadata,
    Columns,
    ForeignKeys,
}

impl DifferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifferenceKind::MissingInSource => "missing_in_source",
            DifferenceKind::MissingInTarget => "missing_in_target",
            DifferenceKind::Metadata => "metadata",
            DifferenceKind::Columns => "columns",
            DifferenceKind::ForeignKeys => "foreign_keys",
        }
    }
}

/// Which side(s) a difference concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferenceSide {
    Source,
    Target,
    Both,
}

impl DifferenceSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifferenceSide::Source => "source",
            DifferenceSide::Target => "target",
            DifferenceSide::Both => "both",
        }
    }
}

/// Both sides' raw values for one differing attribute. Absent and empty
/// remain distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueDiff {
    pub source: Option<String>,
    pub target: Option<String>,
}

/// Per-attribute differences for one shared column. Only differing
/// attributes are present; attribute order is fixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ValueDiff>,
    #[serde(rename = "Collation", skip_serializing_if = "Option::is_none")]
    pub collation: Option<ValueDiff>,
    #[serde(rename = "Null", skip_serializing_if = "Option::is_none")]
    pub nullable: Option<ValueDiff>,
    #[serde(rename = "Key", skip_serializing_if = "Option::is_none")]
    pub key_role: Option<ValueDiff>,
    #[serde(rename = "Default", skip_serializing_if = "Option::is_none")]
    pub default: Option<ValueDiff>,
    #[serde(rename = "Extra", skip_serializing_if = "Option::is_none")]
    pub extra: Option<ValueDiff>,
    #[serde(rename = "Comment", skip_serializing_if = "Option::is_none")]
    pub comment: Option<ValueDiff>,
}

impl ColumnDrift {
    pub fn is_empty(&self) -> bool {
        self.attribute_count() == 0
    }

    pub fn attribute_count(&self) -> usize {
        [
            self.column_type.is_some(),
            self.collation.is_some(),
            self.nullable.is_some(),
            self.key_role.is_some(),
            self.default.is_some(),
            self.extra.is_some(),
            self.comment.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// Table-level metadata differences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataDrift {
    #[serde(rename = "Engine", skip_serializing_if = "Option::is_none")]
    pub engine: Option<ValueDiff>,
    #[serde(rename = "Collation", skip_serializing_if = "Option::is_none")]
    pub collation: Option<ValueDiff>,
}

impl MetadataDrift {
    pub fn is_empty(&self) -> bool {
        self.engine.is_none() && self.collation.is_none()
    }
}

/// A name-level foreign-key match whose definitions disagree. Carries both
/// full original definitions for downstream display, not just the
/// normalized forms that decided the mismatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDrift {
    pub source: ForeignKeySnapshot,
    pub target: ForeignKeySnapshot,
}

/// Payload for a table absent from one side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistencePayload {
    pub message: String,
}

/// Payload for table-level metadata mismatches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    pub differences: MetadataDrift,
}

/// Payload aggregating every column-level finding for one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsPayload {
    pub only_in_source: Vec<String>,
    pub only_in_target: Vec<String>,
    pub modified: OrderedMap<ColumnDrift>,
}

impl ColumnsPayload {
    pub fn is_empty(&self) -> bool {
        self.only_in_source.is_empty() && self.only_in_target.is_empty() && self.modified.is_empty()
    }
}

/// Payload aggregating every foreign-key finding for one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeysPayload {
    pub only_in_source: OrderedMap<ForeignKeySnapshot>,
    pub only_in_target: OrderedMap<ForeignKeySnapshot>,
    pub modified: OrderedMap<ForeignKeyDrift>,
}

impl ForeignKeysPayload {
    pub fn is_empty(&self) -> bool {
        self.only_in_source.is_empty() && self.only_in_target.is_empty() && self.modified.is_empty()
    }
}

/// One difference finding, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DifferencePayload {
    Existence(ExistencePayload),
    Metadata(MetadataPayload),
    Columns(ColumnsPayload),
    ForeignKeys(ForeignKeysPayload),
}

/// A persisted finding: one row per kind per table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDifference {
    pub run_id: Uuid,
    pub table_name: String,
    pub kind: DifferenceKind,
    pub side: DifferenceSide,
    pub payload: DifferencePayload,
}

impl TableDifference {
    pub fn missing_in_source(run_id: Uuid, table_name: &str) -> Self {
        Self {
            run_id,
            table_name: table_name.to_string(),
            kind: DifferenceKind::MissingInSource,
            side: DifferenceSide::Source,
            payload: DifferencePayload::Existence(ExistencePayload {
                message: "Table missing in source database".to_string(),
            }),
        }
    }

    pub fn missing_in_target(run_id: Uuid, table_name: &str) -> Self {
        Self {
            run_id,
            table_name: table_name.to_string(),
            kind: DifferenceKind::MissingInTarget,
            side: DifferenceSide::Target,
            payload: DifferencePayload::Existence(ExistencePayload {
                message: "Table missing in target database".to_string(),
            }),
        }
    }

    pub fn metadata(run_id: Uuid, table_name: &str, differences: MetadataDrift) -> Self {
        Self {
            run_id,
            table_name: table_name.to_string(),
            kind: DifferenceKind::Metadata,
            side: DifferenceSide::Both,
            payload: DifferencePayload::Metadata(MetadataPayload { differences }),
        }
    }

    pub fn columns(run_id: Uuid, table_name: &str, payload: ColumnsPayload) -> Self {
        Self {
            run_id,
            table_name: table_name.to_string(),
            kind: DifferenceKind::Columns,
            side: DifferenceSide::Both,
            payload: DifferencePayload::Columns(payload),
        }
    }

    pub fn foreign_keys(run_id: Uuid, table_name: &str, payload: ForeignKeysPayload) -> Self {
        Self {
            run_id,
            table_name: table_name.to_string(),
            kind: DifferenceKind::ForeignKeys,
            side: DifferenceSide::Both,
            payload: DifferencePayload::ForeignKeys(payload),
        }
    }
}
