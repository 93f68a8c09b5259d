//! Row-oriented lot storage.
//!
//! The ledger is persisted as one table: a header row plus string cells, read
//! and written wholesale. Every stored table carries an opaque [`Revision`];
//! `write_all` only succeeds when the caller's revision is still current, so
//! two sessions racing on the same sheet get a `Conflict` instead of a silent
//! lost update.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod codec;
pub mod csv_file;
pub mod memory;
pub mod sqlite;

pub use codec::{Snapshot, COLUMNS};
pub use csv_file::CsvLotStore;
pub use memory::MemoryLotStore;
pub use sqlite::SqliteLotStore;

/// Opaque version token of a stored table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub String);

impl Revision {
    pub fn new(token: impl Into<String>) -> Self {
        Revision(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Header plus rows of string cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTable {
    pub table: Table,
    pub revision: Revision,
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("revision conflict: expected {expected}, store is at {actual}")]
    Conflict { expected: Revision, actual: Revision },
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Persistence collaborator for the lot sheet.
#[async_trait]
pub trait LotStore: Send + Sync + fmt::Debug {
    /// Read the whole table and its current revision.
    async fn read_all(&self) -> Result<VersionedTable, StoreError>;

    /// Replace the whole table if the store is still at `expected`.
    ///
    /// # Returns
    /// The new revision. On `Conflict` nothing is written.
    async fn write_all(&self, table: &Table, expected: &Revision) -> Result<Revision, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Conflict {
            expected: Revision::new("3"),
            actual: Revision::new("4"),
        };
        assert_eq!(
            err.to_string(),
            "revision conflict: expected 3, store is at 4"
        );
        assert_eq!(
            StoreError::Unavailable("timeout".to_string()).to_string(),
            "store unavailable: timeout"
        );
    }

    #[test]
    fn test_revision_serializes_as_string() {
        let json = serde_json::to_string(&Revision::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
