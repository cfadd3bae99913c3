//! Replica schema initialization

use super::{ReplicaError, SCHEMA_VERSION};
use rusqlite::{params, Connection};

/// Drop every collection and recreate the current schema
pub(super) fn rebuild(conn: &Connection) -> Result<(), ReplicaError> {
    conn.execute_batch(
        r"
        DROP TABLE IF EXISTS schema_version;
        DROP TABLE IF EXISTS patients;
        DROP TABLE IF EXISTS medications;
        DROP TABLE IF EXISTS allergies;
        DROP TABLE IF EXISTS problems;
        DROP TABLE IF EXISTS appointments;
        DROP TABLE IF EXISTS documents;
        DROP TABLE IF EXISTS meta;
        ",
    )?;
    init(conn)
}

fn init(conn: &Connection) -> Result<(), ReplicaError> {
    conn.execute_batch(
        r"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        -- Patient profiles, indexed for offline chart search
        CREATE TABLE IF NOT EXISTS patients (
            id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL,
            first_name TEXT,
            last_name TEXT,
            email TEXT,
            phone TEXT,
            chart_number TEXT,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_patients_patient ON patients(patient_id);
        CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients(last_name);
        CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(last_name, first_name);

        CREATE TABLE IF NOT EXISTS medications (
            id TEXT PRIMARY KEY,
            patient_id TEXT,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_medications_patient ON medications(patient_id);

        CREATE TABLE IF NOT EXISTS allergies (
            id TEXT PRIMARY KEY,
            patient_id TEXT,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_allergies_patient ON allergies(patient_id);

        CREATE TABLE IF NOT EXISTS problems (
            id TEXT PRIMARY KEY,
            patient_id TEXT,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_problems_patient ON problems(patient_id);

        -- Appointments are additionally range-queried by scheduled time
        CREATE TABLE IF NOT EXISTS appointments (
            id TEXT PRIMARY KEY,
            patient_id TEXT,
            scheduled_at TEXT,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
        CREATE INDEX IF NOT EXISTS idx_appointments_scheduled ON appointments(scheduled_at);

        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            patient_id TEXT,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_documents_patient ON documents(patient_id);

        -- Sync bookkeeping
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        ",
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
        params![SCHEMA_VERSION],
    )?;
    Ok(())
}
