//! Comparison run lifecycle models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which live database a snapshot or difference belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseSide {
    Source,
    Target,
}

impl DatabaseSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseSide::Source => "source",
            DatabaseSide::Target => "target",
        }
    }
}

impl std::fmt::Display for DatabaseSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Run status: `running` until the orchestrator records the terminal state.
/// Terminal states are never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// One schema-comparison session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRun {
    pub id: Uuid,
    pub source_label: String,
    pub target_label: String,
    pub source_database: String,
    pub target_database: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Drafted SQL for one table of one run, unique per (run, table)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSql {
    pub run_id: Uuid,
    pub table_name: String,
    pub statements: String,
    pub model_name: String,
    pub generated_at: DateTime<Utc>,
}
