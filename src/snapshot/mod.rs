//! Snapshot capture and storage
//!
//! This module provides:
//! - Snapshot capture (reading one live side into the workspace)
//! - The snapshot workspace store (persistence and read-back)

pub mod capture;
pub mod store;

pub use capture::capture_database_snapshot;
pub use store::{ComparisonStore, StoredTableSnapshot};
