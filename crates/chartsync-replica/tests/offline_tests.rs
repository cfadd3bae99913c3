//! The replica keeps read paths answering when the backend is failing

use chartsync_domain::{MemoryStore, Table};
use chartsync_replica::{ReplicaDomain, ReplicaStore, SyncScheduler};
use chartsync_test_utils::seeded_store;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn offline_search_survives_backend_outage() {
    let store = Arc::new(seeded_store());
    let replica = Arc::new(ReplicaStore::open_in_memory().unwrap());
    let scheduler =
        SyncScheduler::new(store.clone(), Arc::clone(&replica), Duration::from_secs(300));

    assert!(scheduler.sync_once().await.is_clean());

    // backend goes dark
    for table in Table::ALL {
        store.fail_on(table);
    }

    let hits = replica.search_patients("hawkins", 25).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], json!("p1"));

    let patient = replica.get_patient("p1").unwrap().unwrap();
    assert_eq!(patient["last_name"], json!("Hawkins"));

    let meds = replica
        .rows_for_patient(ReplicaDomain::Medications, "p1")
        .unwrap();
    assert_eq!(meds.len(), 2);

    // the next pass fails everywhere, but reads still serve the last sync
    let report = scheduler.sync_once().await;
    assert_eq!(report.failed.len(), ReplicaDomain::ALL.len());
    assert_eq!(replica.search_patients("hawkins", 25).unwrap().len(), 1);
}

#[tokio::test]
async fn periodic_scheduler_syncs_until_aborted() {
    let store = Arc::new(seeded_store());
    let replica = Arc::new(ReplicaStore::open_in_memory().unwrap());
    let scheduler = Arc::new(SyncScheduler::new(
        store,
        Arc::clone(&replica),
        Duration::from_millis(50),
    ));

    // the first tick fires immediately
    let handle = scheduler.spawn();
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.abort();

    let status = replica.status().unwrap();
    assert!(status.available);
    assert!(status.last_sync.is_some());
    assert_eq!(replica.count(ReplicaDomain::Patients).unwrap(), 1);
}
