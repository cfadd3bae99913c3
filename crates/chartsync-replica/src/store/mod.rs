//! Versioned local replica database
//!
//! One SQLite collection per replicated domain, each keyed by the
//! entity's own id with the full row as a JSON payload plus extracted
//! index columns, and a `meta` collection for sync bookkeeping.
//!
//! The schema carries a version; on mismatch every collection is
//! dropped and recreated. The replica is rebuilt wholesale by the next
//! sync, so nothing is migrated.

mod queries;
mod schema;

use crate::domain::ReplicaDomain;
use chartsync_domain::{patient_id_of, record_id, Record};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Current schema version - the database is rebuilt on mismatch
const SCHEMA_VERSION: i32 = 1;

/// Meta key holding the last successful sync timestamp
pub const LAST_SYNC_KEY: &str = "last_sync_at";

/// Failures surfaced by the replica
#[derive(Debug, thiserror::Error)]
pub enum ReplicaError {
    /// The local database cannot be opened in this environment
    #[error("replica database unavailable: {0}")]
    Unavailable(String),

    /// SQLite failure
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Stored payload is not valid JSON
    #[error("row payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

/// One sync bookkeeping record
#[derive(Debug, Clone, PartialEq)]
pub struct MetaRecord {
    /// Lookup key
    pub key: String,
    /// Stored value
    pub value: Value,
    /// RFC 3339 write timestamp
    pub updated_at: String,
}

/// Operator-facing replica health
#[derive(Debug, Clone, Default)]
pub struct CacheStatus {
    /// False when the local database cannot be opened
    pub available: bool,
    /// Timestamp of the last successful sync, if any
    pub last_sync: Option<DateTime<Utc>>,
    /// Live row count per collection
    pub counts: HashMap<&'static str, u64>,
    /// Reason the replica is unavailable
    pub detail: Option<String>,
}

impl CacheStatus {
    /// Status for an environment where the database cannot open
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            detail: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// The durable local store
pub struct ReplicaStore {
    conn: Mutex<Connection>,
}

impl ReplicaStore {
    /// Open (or create) the replica at `path`
    ///
    /// WAL mode keeps scheduler writes from blocking concurrent reads.
    pub fn open(path: &Path) -> Result<Self, ReplicaError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| ReplicaError::Unavailable(err.to_string()))?;
        }
        let conn =
            Connection::open(path).map_err(|err| ReplicaError::Unavailable(err.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|err| ReplicaError::Unavailable(err.to_string()))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// In-memory replica for tests
    pub fn open_in_memory() -> Result<Self, ReplicaError> {
        let conn = Connection::open_in_memory()
            .map_err(|err| ReplicaError::Unavailable(err.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), ReplicaError> {
        let conn = self.conn.lock();
        let version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);
        if version != SCHEMA_VERSION {
            if version != 0 {
                warn!("replica schema v{version} found, rebuilding as v{SCHEMA_VERSION}");
            }
            schema::rebuild(&conn)?;
        }
        Ok(())
    }

    /// Upsert one domain's rows in a single transaction
    ///
    /// Rows are keyed by their own id, so re-upserting the same input is
    /// idempotent. Rows without an id are skipped with a warning.
    /// Returns the number of rows stored.
    pub fn bulk_upsert(
        &self,
        domain: ReplicaDomain,
        rows: &[Record],
    ) -> Result<usize, ReplicaError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut stored = 0usize;
        for row in rows {
            let Some(id) = record_id(row) else {
                warn!("skipping {domain} row without id");
                continue;
            };
            let payload = serde_json::to_string(row)?;
            match domain {
                ReplicaDomain::Patients => {
                    tx.execute(
                        "INSERT OR REPLACE INTO patients
                         (id, patient_id, first_name, last_name, email, phone, chart_number, payload)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        params![
                            id,
                            id,
                            text_field(row, "first_name"),
                            text_field(row, "last_name"),
                            text_field(row, "email"),
                            text_field(row, "phone"),
                            text_field(row, "chart_number"),
                            payload
                        ],
                    )?;
                }
                ReplicaDomain::Appointments => {
                    tx.execute(
                        "INSERT OR REPLACE INTO appointments
                         (id, patient_id, scheduled_at, payload)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            id,
                            patient_id_of(row),
                            text_field(row, "scheduled_at"),
                            payload
                        ],
                    )?;
                }
                ReplicaDomain::Medications
                | ReplicaDomain::Allergies
                | ReplicaDomain::Problems
                | ReplicaDomain::Documents => {
                    tx.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {} (id, patient_id, payload) VALUES (?1, ?2, ?3)",
                            domain.collection()
                        ),
                        params![id, patient_id_of(row), payload],
                    )?;
                }
            }
            stored += 1;
        }
        tx.commit()?;
        Ok(stored)
    }

    /// Write one bookkeeping record
    pub fn set_meta(&self, key: &str, value: &Value) -> Result<(), ReplicaError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Read one bookkeeping record
    pub fn get_meta(&self, key: &str) -> Result<Option<MetaRecord>, ReplicaError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT key, value, updated_at FROM meta WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        match row {
            Some((key, value, updated_at)) => Ok(Some(MetaRecord {
                key,
                value: serde_json::from_str(&value)?,
                updated_at,
            })),
            None => Ok(None),
        }
    }

    /// Live row count of one collection
    pub fn count(&self, domain: ReplicaDomain) -> Result<u64, ReplicaError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", domain.collection()),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Replica health for operator diagnostics
    pub fn status(&self) -> Result<CacheStatus, ReplicaError> {
        let last_sync = self
            .get_meta(LAST_SYNC_KEY)?
            .and_then(|meta| {
                meta.value
                    .as_str()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            })
            .map(|dt| dt.with_timezone(&Utc));

        let mut counts = HashMap::new();
        for domain in ReplicaDomain::ALL {
            counts.insert(domain.collection(), self.count(domain)?);
        }

        Ok(CacheStatus {
            available: true,
            last_sync,
            counts,
            detail: None,
        })
    }

    /// Empty every collection, best-effort
    ///
    /// Continues past individual failures so one broken collection does
    /// not strand the rest.
    pub fn clear_all(&self) {
        let conn = self.conn.lock();
        let collections = ReplicaDomain::ALL
            .iter()
            .map(|domain| domain.collection())
            .chain(std::iter::once("meta"));
        for table in collections {
            if let Err(err) = conn.execute(&format!("DELETE FROM {table}"), []) {
                warn!("failed to clear replica collection {table}: {err}");
            }
        }
    }
}

fn text_field<'a>(row: &'a Record, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}
