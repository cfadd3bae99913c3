//! In-process backing store
//!
//! Backs the dev server and the test suites. Collections live in a
//! `DashMap` keyed by table name, oldest row first; reads reverse so the
//! newest-first contract holds. Per-table failure injection and a write
//! counter let callers exercise the layer's degradation paths.

use crate::record::{id_matches, patient_id_of, Record};
use crate::store::{PatientStore, StoreError};
use crate::table::Table;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// DashMap-backed [`PatientStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<&'static str, Vec<Record>>,
    failing: DashSet<&'static str>,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a table, oldest first
    pub fn seed<I>(&self, table: Table, rows: I)
    where
        I: IntoIterator<Item = Record>,
    {
        self.tables
            .entry(table.table_name())
            .or_default()
            .extend(rows);
    }

    /// Make every operation against `table` fail until cleared
    pub fn fail_on(&self, table: Table) {
        self.failing.insert(table.table_name());
    }

    /// Clear an injected failure
    pub fn clear_failure(&self, table: Table) {
        self.failing.remove(table.table_name());
    }

    /// Number of write operations that reached the store
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current row count of a table
    #[must_use]
    pub fn row_count(&self, table: Table) -> usize {
        self.tables
            .get(table.table_name())
            .map_or(0, |rows| rows.len())
    }

    fn check_readable(&self, table: Table) -> Result<(), StoreError> {
        if self.failing.contains(table.table_name()) {
            return Err(StoreError::Query {
                table: table.table_name(),
                message: "simulated backend failure".to_string(),
            });
        }
        Ok(())
    }

    fn check_writable(&self, table: Table) -> Result<(), StoreError> {
        if self.failing.contains(table.table_name()) {
            return Err(StoreError::Write {
                table: table.table_name(),
                message: "simulated backend failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PatientStore for MemoryStore {
    async fn get_row(&self, table: Table, id: &str) -> Result<Option<Record>, StoreError> {
        self.check_readable(table)?;
        Ok(self
            .tables
            .get(table.table_name())
            .and_then(|rows| rows.iter().find(|r| id_matches(r, id)).cloned()))
    }

    async fn rows_for_patient(
        &self,
        table: Table,
        patient_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError> {
        self.check_readable(table)?;
        let Some(rows) = self.tables.get(table.table_name()) else {
            return Ok(Vec::new());
        };
        let mut matched: Vec<Record> = rows
            .iter()
            .rev()
            .filter(|r| match table {
                // a profile owns itself
                Table::Patients => id_matches(r, patient_id),
                _ => patient_id_of(r) == Some(patient_id),
            })
            .cloned()
            .collect();
        if let Some(cap) = limit {
            matched.truncate(cap);
        }
        Ok(matched)
    }

    async fn all_rows(&self, table: Table, limit: usize) -> Result<Vec<Record>, StoreError> {
        self.check_readable(table)?;
        let Some(rows) = self.tables.get(table.table_name()) else {
            return Ok(Vec::new());
        };
        Ok(rows.iter().rev().take(limit).cloned().collect())
    }

    async fn update_row(
        &self,
        table: Table,
        id: &str,
        updates: &Record,
    ) -> Result<Record, StoreError> {
        self.check_writable(table)?;
        let mut rows = self.tables.entry(table.table_name()).or_default();
        let row = rows
            .iter_mut()
            .find(|r| id_matches(r, id))
            .ok_or_else(|| StoreError::NotFound {
                table: table.table_name(),
                id: id.to_string(),
            })?;
        crate::record::merge_record(row, updates);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(row.clone())
    }

    async fn insert_row(&self, table: Table, record: Record) -> Result<Record, StoreError> {
        self.check_writable(table)?;
        let mut record = record;
        if !record.contains_key("id") {
            record.insert(
                "id".to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
        if !record.contains_key("created_at") {
            record.insert(
                "created_at".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        self.tables
            .entry(table.table_name())
            .or_default()
            .push(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn delete_row(&self, table: Table, id: &str) -> Result<(), StoreError> {
        self.check_writable(table)?;
        let mut rows = self.tables.entry(table.table_name()).or_default();
        let position = rows
            .iter()
            .position(|r| id_matches(r, id))
            .ok_or_else(|| StoreError::NotFound {
                table: table.table_name(),
                id: id.to_string(),
            })?;
        rows.remove(position);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
