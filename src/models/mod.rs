//! Engine data models
//!
//! Everything the snapshot workspace stores and the comparison emits:
//! run lifecycle, captured structure, and difference findings.

pub mod difference;
pub mod ordered;
pub mod run;
pub mod snapshot;

pub use difference::{
    ColumnDrift, ColumnsPayload, DifferenceKind, DifferencePayload, DifferenceSide,
    ForeignKeyDrift, ForeignKeysPayload, MetadataDrift, TableDifference, ValueDiff,
};
pub use ordered::{natural_cmp, OrderedMap};
pub use run::{ComparisonRun, DatabaseSide, GeneratedSql, RunStatus};
pub use snapshot::{
    ColumnSnapshot, ForeignKeyColumn, ForeignKeySnapshot, TableMetadata, TableStatus,
};
