//! Table routing for the patient data layer
//!
//! Every backing table the layer reads or mutates is a variant of one
//! closed enumeration. Wire names, verb-specific whitelist membership,
//! and per-domain read caps all hang off exhaustive matches, so the
//! aggregation query list, the mutation surface, and the bundle paths
//! cannot drift apart without a compile error.

use std::fmt;

/// Mutation verbs exposed by the generic table surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    /// Partial update of one row (PUT)
    Update,
    /// Insert of one row (POST)
    Create,
    /// Hard delete of one row (DELETE)
    Delete,
}

impl Mutation {
    /// HTTP verb name, used in error messages
    #[inline]
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Update => "PUT",
            Self::Create => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// Backing tables known to the data layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Patient profiles
    Patients,
    /// Active and historical medications
    Medications,
    /// Allergy list
    Allergies,
    /// Problem list
    Problems,
    /// Vital sign readings
    Vitals,
    /// Clinical notes
    ClinicalNotes,
    /// Uploaded documents
    Documents,
    /// Immunization records
    Immunizations,
    /// Insurance coverage rows
    Insurance,
    /// Family history entries
    FamilyHistory,
    /// Social history entries
    SocialHistory,
    /// Surgical history entries
    SurgicalHistory,
    /// Prescriptions
    Prescriptions,
    /// Lab orders
    LabOrders,
    /// Lab results
    LabResults,
    /// Billing claims
    BillingClaims,
    /// Billing payments
    BillingPayments,
    /// Care plans
    CarePlans,
    /// Scheduled appointments
    Appointments,
    /// Decision-support alerts
    CdssAlerts,
    /// Referrals
    Referrals,
    /// Staff tasks
    StaffTasks,
    /// Preferred pharmacy on file (read-only)
    Pharmacy,
}

impl Table {
    /// Every table, in aggregation order
    pub const ALL: [Self; 23] = [
        Self::Patients,
        Self::Medications,
        Self::Allergies,
        Self::Problems,
        Self::Vitals,
        Self::ClinicalNotes,
        Self::Documents,
        Self::Immunizations,
        Self::Insurance,
        Self::FamilyHistory,
        Self::SocialHistory,
        Self::SurgicalHistory,
        Self::Prescriptions,
        Self::LabOrders,
        Self::LabResults,
        Self::BillingClaims,
        Self::BillingPayments,
        Self::CarePlans,
        Self::Appointments,
        Self::CdssAlerts,
        Self::Referrals,
        Self::StaffTasks,
        Self::Pharmacy,
    ];

    /// Relational table name on the wire
    #[inline]
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Medications => "patient_medications",
            Self::Allergies => "patient_allergies",
            Self::Problems => "patient_problems",
            Self::Vitals => "patient_vitals",
            Self::ClinicalNotes => "clinical_notes",
            Self::Documents => "patient_documents",
            Self::Immunizations => "patient_immunizations",
            Self::Insurance => "patient_insurance",
            Self::FamilyHistory => "patient_family_history",
            Self::SocialHistory => "patient_social_history",
            Self::SurgicalHistory => "patient_surgical_history",
            Self::Prescriptions => "prescriptions",
            Self::LabOrders => "lab_orders",
            Self::LabResults => "lab_results",
            Self::BillingClaims => "billing_claims",
            Self::BillingPayments => "billing_payments",
            Self::CarePlans => "care_plans",
            Self::Appointments => "appointments",
            Self::CdssAlerts => "cdss_alerts",
            Self::Referrals => "referrals",
            Self::StaffTasks => "staff_tasks",
            Self::Pharmacy => "patient_pharmacy",
        }
    }

    /// Resolve a wire table name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.table_name() == name)
    }

    /// Whether `verb` may touch this table through the generic surface
    ///
    /// PUT covers every mutable table including `patients`. POST drops
    /// `patients` (patient creation is a separate flow). DELETE further
    /// drops billing and scheduling tables; those rows are voided through
    /// their own workflows, never hard-deleted here.
    #[inline]
    #[must_use]
    pub const fn allows(self, verb: Mutation) -> bool {
        match verb {
            Mutation::Update => !matches!(self, Self::Pharmacy),
            Mutation::Create => !matches!(self, Self::Patients | Self::Pharmacy),
            Mutation::Delete => !matches!(
                self,
                Self::Patients
                    | Self::Pharmacy
                    | Self::BillingClaims
                    | Self::BillingPayments
                    | Self::Appointments
            ),
        }
    }

    /// Row cap applied when aggregating this table into a bundle
    ///
    /// High-volume domains return only the most recent readings.
    #[inline]
    #[must_use]
    pub const fn fetch_limit(self) -> Option<usize> {
        match self {
            Self::Vitals | Self::Appointments => Some(20),
            _ => None,
        }
    }

    /// Tables permitted for `verb`
    pub fn whitelisted(verb: Mutation) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |t| t.allows(verb))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(Table::parse(table.table_name()), Some(table));
        }
        assert_eq!(Table::parse("secret_table"), None);
        assert_eq!(Table::parse(""), None);
    }

    #[test]
    fn post_whitelist_is_put_minus_patients() {
        let put: Vec<_> = Table::whitelisted(Mutation::Update).collect();
        let post: Vec<_> = Table::whitelisted(Mutation::Create).collect();

        assert!(put.contains(&Table::Patients));
        assert!(!post.contains(&Table::Patients));
        for table in &post {
            assert!(put.contains(table));
        }
        assert_eq!(post.len(), put.len() - 1);
    }

    #[test]
    fn delete_whitelist_excludes_billing_and_scheduling() {
        let del: Vec<_> = Table::whitelisted(Mutation::Delete).collect();

        for table in [
            Table::Patients,
            Table::BillingClaims,
            Table::BillingPayments,
            Table::Appointments,
            Table::Pharmacy,
        ] {
            assert!(!del.contains(&table), "{table} must not be deletable");
        }
        assert!(del.contains(&Table::Medications));
        assert!(del.contains(&Table::Referrals));
    }

    #[test]
    fn pharmacy_is_read_only() {
        for verb in [Mutation::Update, Mutation::Create, Mutation::Delete] {
            assert!(!Table::Pharmacy.allows(verb));
        }
    }

    #[test]
    fn high_volume_domains_are_capped() {
        assert_eq!(Table::Vitals.fetch_limit(), Some(20));
        assert_eq!(Table::Appointments.fetch_limit(), Some(20));
        assert_eq!(Table::Medications.fetch_limit(), None);
    }
}
