//! Patient record aggregation and whitelisted mutation
//!
//! One fetch assembles the full bundle: a profile point-lookup plus one
//! list query per clinical domain, all issued concurrently. A failed
//! sub-query never fails the whole request — that domain degrades to an
//! empty list, because a single slow or broken table must not blank the
//! entire patient view.

use chartsync_domain::{
    BillingRecords, HistoryRecords, Mutation, PatientRecordBundle, PatientStore, Record,
    SourcedRecords, StoreError, Table,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Failures surfaced by the aggregation surface
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// Fetch was called without a patient id
    #[error("patient_id required")]
    MissingPatientId,

    /// Mutation was called without a record id
    #[error("record id required")]
    MissingRecordId,

    /// Table name does not resolve to a known table
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Table is known but not permitted for the verb
    #[error("table {table} is not allowed for {verb}")]
    NotWhitelisted {
        /// Requested table name
        table: String,
        /// Rejecting verb
        verb: &'static str,
    },

    /// Backing store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AggregateError {
    /// True for caller mistakes (4xx); false for store failures (5xx)
    #[inline]
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// Assembles patient bundles and applies whitelisted mutations
pub struct AggregatorService {
    store: Arc<dyn PatientStore>,
}

impl AggregatorService {
    /// Create a service over an injected backing store
    #[must_use]
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self { store }
    }

    /// Assemble the full nested snapshot for one patient
    ///
    /// The profile lookup and every domain query run concurrently; the
    /// response waits for all of them. Individual failures degrade to
    /// `patient: null` or an empty list for that domain only.
    pub async fn fetch_bundle(
        &self,
        patient_id: &str,
    ) -> Result<PatientRecordBundle, AggregateError> {
        if patient_id.trim().is_empty() {
            return Err(AggregateError::MissingPatientId);
        }
        debug!("aggregating bundle for patient {patient_id}");

        let (
            patient,
            medications,
            allergies,
            problems,
            vitals,
            clinical_notes,
            documents,
            immunizations,
            insurance,
            family,
            social,
            surgical,
            prescriptions,
            orders,
            lab_results,
            claims,
            payments,
            care_plans,
            appointments,
            alerts,
            pharmacy,
        ) = tokio::join!(
            self.profile(patient_id),
            self.domain_rows(Table::Medications, patient_id),
            self.domain_rows(Table::Allergies, patient_id),
            self.domain_rows(Table::Problems, patient_id),
            self.domain_rows(Table::Vitals, patient_id),
            self.domain_rows(Table::ClinicalNotes, patient_id),
            self.domain_rows(Table::Documents, patient_id),
            self.domain_rows(Table::Immunizations, patient_id),
            self.domain_rows(Table::Insurance, patient_id),
            self.domain_rows(Table::FamilyHistory, patient_id),
            self.domain_rows(Table::SocialHistory, patient_id),
            self.domain_rows(Table::SurgicalHistory, patient_id),
            self.domain_rows(Table::Prescriptions, patient_id),
            self.domain_rows(Table::LabOrders, patient_id),
            self.domain_rows(Table::LabResults, patient_id),
            self.domain_rows(Table::BillingClaims, patient_id),
            self.domain_rows(Table::BillingPayments, patient_id),
            self.domain_rows(Table::CarePlans, patient_id),
            self.domain_rows(Table::Appointments, patient_id),
            self.domain_rows(Table::CdssAlerts, patient_id),
            self.domain_rows(Table::Pharmacy, patient_id),
        );

        Ok(PatientRecordBundle {
            patient,
            medications: SourcedRecords::partition(medications),
            allergies: SourcedRecords::partition(allergies),
            problems: SourcedRecords::partition(problems),
            vitals,
            appointments,
            clinical_notes: SourcedRecords::partition(clinical_notes),
            documents: SourcedRecords::partition(documents),
            lab_results: SourcedRecords::partition(lab_results),
            immunizations,
            insurance,
            history: HistoryRecords {
                family,
                social,
                surgical,
            },
            prescriptions,
            orders,
            billing: BillingRecords { claims, payments },
            care_plans,
            alerts,
            pharmacy,
        })
    }

    /// Apply a partial update to one whitelisted row
    ///
    /// Stamps a server-assigned `updated_at` before persisting and
    /// returns the canonical row.
    pub async fn update(
        &self,
        table: &str,
        id: &str,
        updates: Record,
    ) -> Result<Record, AggregateError> {
        let target = routed(table, Mutation::Update)?;
        if id.trim().is_empty() {
            return Err(AggregateError::MissingRecordId);
        }
        let mut updates = updates;
        updates.insert(
            "updated_at".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        info!("updating {target} row {id}");
        Ok(self.store.update_row(target, id, &updates).await?)
    }

    /// Insert one row into a whitelisted table
    pub async fn create(&self, table: &str, record: Record) -> Result<Record, AggregateError> {
        let target = routed(table, Mutation::Create)?;
        info!("inserting into {target}");
        Ok(self.store.insert_row(target, record).await?)
    }

    /// Hard-delete one row from a whitelisted table
    pub async fn delete(&self, table: &str, id: &str) -> Result<(), AggregateError> {
        let target = routed(table, Mutation::Delete)?;
        if id.trim().is_empty() {
            return Err(AggregateError::MissingRecordId);
        }
        info!("deleting {target} row {id}");
        Ok(self.store.delete_row(target, id).await?)
    }

    async fn profile(&self, patient_id: &str) -> Option<Record> {
        match self.store.get_row(Table::Patients, patient_id).await {
            Ok(row) => row,
            Err(err) => {
                warn!("patient profile lookup failed, returning null profile: {err}");
                None
            }
        }
    }

    async fn domain_rows(&self, table: Table, patient_id: &str) -> Vec<Record> {
        match self
            .store
            .rows_for_patient(table, patient_id, table.fetch_limit())
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                warn!("{table} query degraded to empty: {err}");
                Vec::new()
            }
        }
    }
}

fn routed(table: &str, verb: Mutation) -> Result<Table, AggregateError> {
    let parsed =
        Table::parse(table).ok_or_else(|| AggregateError::UnknownTable(table.to_string()))?;
    if !parsed.allows(verb) {
        return Err(AggregateError::NotWhitelisted {
            table: table.to_string(),
            verb: verb.verb(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartsync_domain::MemoryStore;
    use chartsync_test_utils::{
        appointment_record, medication_record, mirror_medication_record, patient_record,
        problem_record, vitals_record,
    };
    use serde_json::json;

    fn service() -> (Arc<MemoryStore>, AggregatorService) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), AggregatorService::new(store))
    }

    #[tokio::test]
    async fn empty_patient_id_is_rejected() {
        let (_, service) = service();
        let err = service.fetch_bundle("").await.unwrap_err();
        assert!(matches!(err, AggregateError::MissingPatientId));
        assert_eq!(err.to_string(), "patient_id required");
    }

    #[tokio::test]
    async fn zero_row_patient_yields_complete_empty_bundle() {
        let (store, service) = service();
        store.seed(Table::Patients, [patient_record("p1", "Ada", "Quinn")]);

        let bundle = service.fetch_bundle("p1").await.unwrap();

        assert!(bundle.patient.is_some());
        assert!(bundle.medications.is_empty());
        assert!(bundle.vitals.is_empty());
        assert!(bundle.history.family.is_empty());
        assert!(bundle.billing.claims.is_empty());
        assert!(bundle.pharmacy.is_empty());
    }

    #[tokio::test]
    async fn missing_profile_is_not_fatal() {
        let (store, service) = service();
        store.seed(Table::Medications, [medication_record("m1", "p1", "Statin")]);

        let bundle = service.fetch_bundle("p1").await.unwrap();

        assert!(bundle.patient.is_none());
        assert_eq!(bundle.medications.local.len(), 1);
    }

    #[tokio::test]
    async fn failed_subquery_degrades_to_empty_domain_only() {
        let (store, service) = service();
        store.seed(Table::Patients, [patient_record("p1", "Ada", "Quinn")]);
        store.seed(Table::Medications, [medication_record("m1", "p1", "Statin")]);
        store.seed(Table::Problems, [problem_record("pr1", "p1", "Hypertension")]);
        store.fail_on(Table::Medications);

        let bundle = service.fetch_bundle("p1").await.unwrap();

        assert!(bundle.medications.is_empty());
        assert_eq!(bundle.problems.local.len(), 1);
        assert!(bundle.patient.is_some());
    }

    #[tokio::test]
    async fn profile_failure_returns_null_patient() {
        let (store, service) = service();
        store.seed(Table::Patients, [patient_record("p1", "Ada", "Quinn")]);
        store.seed(Table::Problems, [problem_record("pr1", "p1", "Hypertension")]);
        store.fail_on(Table::Patients);

        let bundle = service.fetch_bundle("p1").await.unwrap();

        assert!(bundle.patient.is_none());
        assert_eq!(bundle.problems.local.len(), 1);
    }

    #[tokio::test]
    async fn high_volume_domains_are_capped_at_twenty() {
        let (store, service) = service();
        store.seed(
            Table::Vitals,
            (0..25).map(|i| vitals_record(&format!("v{i}"), "p1")),
        );
        store.seed(
            Table::Appointments,
            (0..25).map(|i| appointment_record(&format!("a{i}"), "p1", "2026-03-01T09:00:00Z")),
        );

        let bundle = service.fetch_bundle("p1").await.unwrap();

        assert_eq!(bundle.vitals.len(), 20);
        assert_eq!(bundle.appointments.len(), 20);
        // newest rows win the cap
        assert_eq!(bundle.vitals[0]["id"], json!("v24"));
    }

    #[tokio::test]
    async fn mirror_rows_are_partitioned_not_merged() {
        let (store, service) = service();
        store.seed(
            Table::Medications,
            [
                medication_record("m1", "p1", "Statin"),
                mirror_medication_record("m2", "p1", "Aspirin"),
            ],
        );

        let bundle = service.fetch_bundle("p1").await.unwrap();

        assert_eq!(bundle.medications.local.len(), 1);
        assert_eq!(bundle.medications.drchrono.len(), 1);
        assert_eq!(bundle.medications.drchrono[0]["id"], json!("m2"));
    }

    #[tokio::test]
    async fn mutations_reject_unknown_and_unwhitelisted_tables() {
        let (store, service) = service();

        let unknown = service
            .update("secret_table", "x", Record::new())
            .await
            .unwrap_err();
        assert!(matches!(unknown, AggregateError::UnknownTable(_)));
        assert!(unknown.is_validation());

        let read_only = service
            .update("patient_pharmacy", "x", Record::new())
            .await
            .unwrap_err();
        assert!(matches!(read_only, AggregateError::NotWhitelisted { .. }));

        let no_create = service
            .create("patients", Record::new())
            .await
            .unwrap_err();
        assert!(matches!(no_create, AggregateError::NotWhitelisted { .. }));

        let no_delete = service.delete("appointments", "a1").await.unwrap_err();
        assert!(matches!(no_delete, AggregateError::NotWhitelisted { .. }));

        assert_eq!(store.write_count(), 0, "rejections must not touch the store");
    }

    #[tokio::test]
    async fn update_stamps_updated_at_and_merges() {
        let (store, service) = service();
        store.seed(Table::Medications, [medication_record("m1", "p1", "Statin")]);

        let row = service
            .update(
                "patient_medications",
                "m1",
                json!({"dose": "40mg"}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(row["dose"], json!("40mg"));
        assert_eq!(row["name"], json!("Statin"));
        assert!(row.get("updated_at").is_some());
    }

    #[tokio::test]
    async fn store_failure_on_mutation_is_surfaced() {
        let (store, service) = service();
        store.seed(Table::Medications, [medication_record("m1", "p1", "Statin")]);
        store.fail_on(Table::Medications);

        let err = service
            .update("patient_medications", "m1", Record::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AggregateError::Store(_)));
        assert!(!err.is_validation());
    }
}
