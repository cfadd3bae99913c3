//! Backing-store interface
//!
//! The relational backend is an external collaborator; this trait is the
//! seam the aggregator and the sync scheduler reach it through. A real
//! deployment implements it over the hosted database client; tests and
//! the dev server use [`crate::MemoryStore`].

use crate::record::Record;
use crate::table::Table;
use async_trait::async_trait;

/// Failures surfaced by a backing store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row with the requested id
    #[error("no row in {table} with id {id}")]
    NotFound {
        /// Table searched
        table: &'static str,
        /// Id requested
        id: String,
    },

    /// Read query failed
    #[error("query against {table} failed: {message}")]
    Query {
        /// Table queried
        table: &'static str,
        /// Backend error text
        message: String,
    },

    /// Write failed
    #[error("write to {table} failed: {message}")]
    Write {
        /// Table written
        table: &'static str,
        /// Backend error text
        message: String,
    },
}

/// Row-level access to the backing relational store
///
/// List operations return rows newest-first; implementations order by
/// their creation timestamp descending.
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Point lookup by primary id
    async fn get_row(&self, table: Table, id: &str) -> Result<Option<Record>, StoreError>;

    /// Rows owned by one patient, newest first, optionally capped
    async fn rows_for_patient(
        &self,
        table: Table,
        patient_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError>;

    /// Bulk scan for replication pulls, newest first, always capped
    async fn all_rows(&self, table: Table, limit: usize) -> Result<Vec<Record>, StoreError>;

    /// Merge `updates` into the row and return the canonical result
    ///
    /// Exactly one row is affected, identified by id.
    async fn update_row(
        &self,
        table: Table,
        id: &str,
        updates: &Record,
    ) -> Result<Record, StoreError>;

    /// Insert and return the stored row, including its generated id
    async fn insert_row(&self, table: Table, record: Record) -> Result<Record, StoreError>;

    /// Hard-delete one row
    async fn delete_row(&self, table: Table, id: &str) -> Result<(), StoreError>;
}
