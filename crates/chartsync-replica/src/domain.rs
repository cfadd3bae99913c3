//! Replicated domains
//!
//! The working set covers the domains offline lookups actually need —
//! chart search and the chart header — not the full table list.

use chartsync_domain::Table;
use std::fmt;

/// Collections the replica maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaDomain {
    /// Patient profiles (searchable offline)
    Patients,
    /// Medications
    Medications,
    /// Allergies
    Allergies,
    /// Problem list
    Problems,
    /// Appointments (range-queried by scheduled time)
    Appointments,
    /// Documents
    Documents,
}

impl ReplicaDomain {
    /// Every replicated domain, in sync order
    pub const ALL: [Self; 6] = [
        Self::Patients,
        Self::Medications,
        Self::Allergies,
        Self::Problems,
        Self::Appointments,
        Self::Documents,
    ];

    /// Collection (SQLite table) name
    #[inline]
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Medications => "medications",
            Self::Allergies => "allergies",
            Self::Problems => "problems",
            Self::Appointments => "appointments",
            Self::Documents => "documents",
        }
    }

    /// Backing table the domain is pulled from
    #[inline]
    #[must_use]
    pub const fn source_table(self) -> Table {
        match self {
            Self::Patients => Table::Patients,
            Self::Medications => Table::Medications,
            Self::Allergies => Table::Allergies,
            Self::Problems => Table::Problems,
            Self::Appointments => Table::Appointments,
            Self::Documents => Table::Documents,
        }
    }

    /// Row cap for one sync pull
    ///
    /// Generous on purpose: the replica holds a working set, not a
    /// sample, and high-volume domains need the headroom.
    #[inline]
    #[must_use]
    pub const fn sync_limit(self) -> usize {
        match self {
            Self::Patients | Self::Medications | Self::Appointments => 50_000,
            Self::Allergies | Self::Problems | Self::Documents => 20_000,
        }
    }
}

impl fmt::Display for ReplicaDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}
