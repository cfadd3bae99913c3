//! Offline-capable read queries
//!
//! All reads serve whatever the most recent successful sync stored.

use super::{ReplicaError, ReplicaStore};
use crate::domain::ReplicaDomain;
use chartsync_domain::Record;
use rusqlite::{params, OptionalExtension};

impl ReplicaStore {
    /// Point lookup of one patient profile
    pub fn get_patient(&self, id: &str) -> Result<Option<Record>, ReplicaError> {
        let conn = self.conn.lock();
        let payload = conn
            .query_row(
                "SELECT payload FROM patients WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Case-insensitive substring search over the patient index columns
    ///
    /// Matches first/last name, email, phone, and chart number; capped
    /// to the first `limit` rows in name order.
    pub fn search_patients(&self, query: &str, limit: usize) -> Result<Vec<Record>, ReplicaError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT payload FROM patients
             WHERE instr(lower(first_name), ?1) > 0
                OR instr(lower(last_name), ?1) > 0
                OR instr(lower(email), ?1) > 0
                OR instr(lower(phone), ?1) > 0
                OR instr(lower(chart_number), ?1) > 0
             ORDER BY last_name, first_name
             LIMIT ?2",
        )?;
        let payloads = stmt.query_map(params![needle, limit as i64], |row| {
            row.get::<_, String>(0)
        })?;

        let mut records = Vec::new();
        for payload in payloads {
            records.push(serde_json::from_str(&payload?)?);
        }
        Ok(records)
    }

    /// One domain's rows for one patient, via the patient index
    pub fn rows_for_patient(
        &self,
        domain: ReplicaDomain,
        patient_id: &str,
    ) -> Result<Vec<Record>, ReplicaError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT payload FROM {} WHERE patient_id = ?1",
            domain.collection()
        ))?;
        let payloads = stmt.query_map(params![patient_id], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for payload in payloads {
            records.push(serde_json::from_str(&payload?)?);
        }
        Ok(records)
    }

    /// Appointments whose scheduled time falls in `[from, to]`
    ///
    /// Bounds and stored values compare as ISO-8601 UTC strings, the
    /// form backend rows carry.
    pub fn appointments_between(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<Record>, ReplicaError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT payload FROM appointments
             WHERE scheduled_at >= ?1 AND scheduled_at <= ?2
             ORDER BY scheduled_at",
        )?;
        let payloads = stmt.query_map(params![from, to], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for payload in payloads {
            records.push(serde_json::from_str(&payload?)?);
        }
        Ok(records)
    }
}
