//! The nested per-patient snapshot assembled by the aggregator
//!
//! Every key is always present in the serialized form: sub-collections
//! are empty arrays rather than null, so consumers iterate without null
//! checks. Only the profile itself may be null (lookup miss or failure).
//!
//! Domains mirrored from the external EHR keep two parallel sequences —
//! the practice's own rows and the mirror — which are never merged.

use crate::record::Record;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rows of one domain split by source of record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcedRecords {
    /// Rows owned by the practice
    #[serde(default)]
    pub local: Vec<Record>,
    /// Read-only mirror of the external EHR
    #[serde(default)]
    pub drchrono: Vec<Record>,
}

impl SourcedRecords {
    /// Split fetched rows by their `source` field
    ///
    /// Mirror rows carry `source: "drchrono"`; everything else is local.
    #[must_use]
    pub fn partition(rows: Vec<Record>) -> Self {
        let (drchrono, local) = rows
            .into_iter()
            .partition(|r| r.get("source").and_then(Value::as_str) == Some("drchrono"));
        Self { local, drchrono }
    }

    /// Total rows across both sources
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.local.len() + self.drchrono.len()
    }

    /// True when both sources are empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.drchrono.is_empty()
    }
}

/// History sub-collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecords {
    /// Family history entries
    #[serde(default)]
    pub family: Vec<Record>,
    /// Social history entries
    #[serde(default)]
    pub social: Vec<Record>,
    /// Surgical history entries
    #[serde(default)]
    pub surgical: Vec<Record>,
}

/// Billing sub-collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingRecords {
    /// Claims
    #[serde(default)]
    pub claims: Vec<Record>,
    /// Payments
    #[serde(default)]
    pub payments: Vec<Record>,
}

/// Full nested snapshot for one patient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecordBundle {
    /// Profile row; null when the lookup missed or failed
    pub patient: Option<Record>,
    /// Medications, both sources
    #[serde(default)]
    pub medications: SourcedRecords,
    /// Allergies, both sources
    #[serde(default)]
    pub allergies: SourcedRecords,
    /// Problem list, both sources
    #[serde(default)]
    pub problems: SourcedRecords,
    /// Most recent vital readings
    #[serde(default)]
    pub vitals: Vec<Record>,
    /// Most recent appointments
    #[serde(default)]
    pub appointments: Vec<Record>,
    /// Clinical notes, both sources
    #[serde(default)]
    pub clinical_notes: SourcedRecords,
    /// Documents, both sources
    #[serde(default)]
    pub documents: SourcedRecords,
    /// Lab results, both sources
    #[serde(default)]
    pub lab_results: SourcedRecords,
    /// Immunizations
    #[serde(default)]
    pub immunizations: Vec<Record>,
    /// Insurance coverage
    #[serde(default)]
    pub insurance: Vec<Record>,
    /// History sub-collections
    #[serde(default)]
    pub history: HistoryRecords,
    /// Prescriptions
    #[serde(default)]
    pub prescriptions: Vec<Record>,
    /// Lab orders
    #[serde(default)]
    pub orders: Vec<Record>,
    /// Billing sub-collections
    #[serde(default)]
    pub billing: BillingRecords,
    /// Care plans
    #[serde(default)]
    pub care_plans: Vec<Record>,
    /// Decision-support alerts
    #[serde(default)]
    pub alerts: Vec<Record>,
    /// Pharmacy on file
    #[serde(default)]
    pub pharmacy: Vec<Record>,
}

impl PatientRecordBundle {
    /// The sub-collection mutations against `table` land in
    ///
    /// Dual-source domains expose their local side; the mirror is never
    /// written through this layer. Returns `None` for the profile (see
    /// [`Self::patient`]) and for tables with no bundle section.
    #[must_use]
    pub fn rows_mut(&mut self, table: Table) -> Option<&mut Vec<Record>> {
        match table {
            Table::Patients | Table::Referrals | Table::StaffTasks => None,
            Table::Medications => Some(&mut self.medications.local),
            Table::Allergies => Some(&mut self.allergies.local),
            Table::Problems => Some(&mut self.problems.local),
            Table::Vitals => Some(&mut self.vitals),
            Table::ClinicalNotes => Some(&mut self.clinical_notes.local),
            Table::Documents => Some(&mut self.documents.local),
            Table::Immunizations => Some(&mut self.immunizations),
            Table::Insurance => Some(&mut self.insurance),
            Table::FamilyHistory => Some(&mut self.history.family),
            Table::SocialHistory => Some(&mut self.history.social),
            Table::SurgicalHistory => Some(&mut self.history.surgical),
            Table::Prescriptions => Some(&mut self.prescriptions),
            Table::LabOrders => Some(&mut self.orders),
            Table::LabResults => Some(&mut self.lab_results.local),
            Table::BillingClaims => Some(&mut self.billing.claims),
            Table::BillingPayments => Some(&mut self.billing.payments),
            Table::CarePlans => Some(&mut self.care_plans),
            Table::Appointments => Some(&mut self.appointments),
            Table::CdssAlerts => Some(&mut self.alerts),
            Table::Pharmacy => Some(&mut self.pharmacy),
        }
    }

    /// Read-only view of the sub-collection for `table`
    #[must_use]
    pub fn rows(&self, table: Table) -> Option<&[Record]> {
        match table {
            Table::Patients | Table::Referrals | Table::StaffTasks => None,
            Table::Medications => Some(&self.medications.local),
            Table::Allergies => Some(&self.allergies.local),
            Table::Problems => Some(&self.problems.local),
            Table::Vitals => Some(&self.vitals),
            Table::ClinicalNotes => Some(&self.clinical_notes.local),
            Table::Documents => Some(&self.documents.local),
            Table::Immunizations => Some(&self.immunizations),
            Table::Insurance => Some(&self.insurance),
            Table::FamilyHistory => Some(&self.history.family),
            Table::SocialHistory => Some(&self.history.social),
            Table::SurgicalHistory => Some(&self.history.surgical),
            Table::Prescriptions => Some(&self.prescriptions),
            Table::LabOrders => Some(&self.orders),
            Table::LabResults => Some(&self.lab_results.local),
            Table::BillingClaims => Some(&self.billing.claims),
            Table::BillingPayments => Some(&self.billing.payments),
            Table::CarePlans => Some(&self.care_plans),
            Table::Appointments => Some(&self.appointments),
            Table::CdssAlerts => Some(&self.alerts),
            Table::Pharmacy => Some(&self.pharmacy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Mutation;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_bundle_serializes_every_key() {
        let value = serde_json::to_value(PatientRecordBundle::default()).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "patient",
            "medications",
            "allergies",
            "problems",
            "vitals",
            "appointments",
            "clinical_notes",
            "documents",
            "lab_results",
            "immunizations",
            "insurance",
            "history",
            "prescriptions",
            "orders",
            "billing",
            "care_plans",
            "alerts",
            "pharmacy",
        ] {
            assert!(object.contains_key(key), "missing bundle key {key}");
        }

        assert!(value["patient"].is_null());
        assert_eq!(value["vitals"], json!([]));
        assert_eq!(value["medications"]["local"], json!([]));
        assert_eq!(value["medications"]["drchrono"], json!([]));
        assert_eq!(value["history"]["family"], json!([]));
        assert_eq!(value["billing"]["claims"], json!([]));
    }

    #[test]
    fn every_put_table_routes_or_is_known_unrouted() {
        let mut bundle = PatientRecordBundle::default();
        for table in Table::whitelisted(Mutation::Update) {
            let routed = bundle.rows_mut(table).is_some();
            let known_unrouted =
                matches!(table, Table::Patients | Table::Referrals | Table::StaffTasks);
            assert!(
                routed || known_unrouted,
                "{table} has no bundle path and is not a known exception"
            );
        }
    }

    #[test]
    fn partition_splits_on_source_field() {
        let rows = vec![
            json!({"id": "a", "name": "own row"}).as_object().cloned().unwrap(),
            json!({"id": "b", "source": "drchrono"}).as_object().cloned().unwrap(),
            json!({"id": "c", "source": "local"}).as_object().cloned().unwrap(),
        ];

        let split = SourcedRecords::partition(rows);

        assert_eq!(split.local.len(), 2);
        assert_eq!(split.drchrono.len(), 1);
        assert_eq!(split.drchrono[0]["id"], json!("b"));
        assert_eq!(split.len(), 3);
    }
}
