//! Testing utilities for the chartsync workspace
//!
//! Shared row fixtures and seeded stores.

#![allow(missing_docs)]

use chartsync_domain::{MemoryStore, Record, Table};
use serde_json::{json, Value};

/// Convert a `json!` object literal into a row
pub fn row(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

pub fn patient_record(id: &str, first_name: &str, last_name: &str) -> Record {
    row(json!({
        "id": id,
        "first_name": first_name,
        "last_name": last_name,
        "email": format!("{}.{}@example.com", first_name.to_lowercase(), last_name.to_lowercase()),
        "phone": "555-0100",
        "chart_number": format!("CH-{id}"),
    }))
}

pub fn medication_record(id: &str, patient_id: &str, name: &str) -> Record {
    row(json!({
        "id": id,
        "patient_id": patient_id,
        "name": name,
        "dose": "10mg",
        "status": "active",
    }))
}

/// A medication row mirrored from the external EHR
pub fn mirror_medication_record(id: &str, patient_id: &str, name: &str) -> Record {
    let mut record = medication_record(id, patient_id, name);
    record.insert("source".to_string(), Value::String("drchrono".to_string()));
    record
}

pub fn allergy_record(id: &str, patient_id: &str, allergen: &str) -> Record {
    row(json!({
        "id": id,
        "patient_id": patient_id,
        "allergen": allergen,
        "severity": "moderate",
    }))
}

pub fn problem_record(id: &str, patient_id: &str, description: &str) -> Record {
    row(json!({
        "id": id,
        "patient_id": patient_id,
        "description": description,
        "status": "active",
    }))
}

pub fn vitals_record(id: &str, patient_id: &str) -> Record {
    row(json!({
        "id": id,
        "patient_id": patient_id,
        "systolic": 120,
        "diastolic": 80,
        "pulse": 68,
    }))
}

pub fn appointment_record(id: &str, patient_id: &str, scheduled_at: &str) -> Record {
    row(json!({
        "id": id,
        "patient_id": patient_id,
        "scheduled_at": scheduled_at,
        "reason": "Follow-up",
        "status": "scheduled",
    }))
}

pub fn document_record(id: &str, patient_id: &str, title: &str) -> Record {
    row(json!({
        "id": id,
        "patient_id": patient_id,
        "title": title,
        "mime_type": "application/pdf",
    }))
}

pub fn referral_record(id: &str, patient_id: &str) -> Record {
    row(json!({
        "id": id,
        "patient_id": patient_id,
        "specialty": "Cardiology",
        "status": "pending",
    }))
}

/// A store seeded with one patient and a small working set
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.seed(Table::Patients, [patient_record("p1", "Marcus", "Hawkins")]);
    store.seed(
        Table::Medications,
        [
            medication_record("m1", "p1", "Lisinopril"),
            mirror_medication_record("m2", "p1", "Aspirin"),
        ],
    );
    store.seed(Table::Allergies, [allergy_record("al1", "p1", "Penicillin")]);
    store.seed(Table::Problems, [problem_record("pr1", "p1", "Hypertension")]);
    store.seed(
        Table::Appointments,
        [appointment_record("a1", "p1", "2026-03-02T14:30:00Z")],
    );
    store.seed(Table::Documents, [document_record("d1", "p1", "Referral letter")]);
    store
}
