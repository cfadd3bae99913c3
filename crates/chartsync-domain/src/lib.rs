//! Chartsync domain model
//!
//! Shared vocabulary of the patient data layer:
//! - `Table`: the closed routing enumeration — wire names, whitelist
//!   membership, per-domain read caps
//! - `PatientRecordBundle`: the nested per-patient snapshot
//! - `PatientStore`: the backing-store seam, plus an in-process
//!   implementation for tests and the dev server

pub mod bundle;
pub mod memory;
pub mod record;
pub mod store;
pub mod table;

pub use bundle::{BillingRecords, HistoryRecords, PatientRecordBundle, SourcedRecords};
pub use memory::MemoryStore;
pub use record::{id_matches, merge_record, patient_id_of, record_id, Record};
pub use store::{PatientStore, StoreError};
pub use table::{Mutation, Table};
