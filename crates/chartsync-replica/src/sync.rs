//! Periodic replication from the backing store
//!
//! Each domain syncs independently: its bulk pull and upsert are one
//! local transaction, so a failed domain never rolls back siblings that
//! already landed.

use crate::domain::ReplicaDomain;
use crate::store::{ReplicaStore, LAST_SYNC_KEY};
use crate::CacheStatus;
use chartsync_domain::PatientStore;
use chrono::Utc;
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Outcome of one sync pass
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Domains that landed, with rows stored
    pub synced: Vec<(ReplicaDomain, usize)>,
    /// Domains that failed, with the error text
    pub failed: Vec<(ReplicaDomain, String)>,
}

impl SyncReport {
    /// True when every domain landed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Pulls the working set into the replica, periodically or on demand
pub struct SyncScheduler {
    store: Arc<dyn PatientStore>,
    replica: Arc<ReplicaStore>,
    interval: Duration,
}

impl SyncScheduler {
    /// Create a scheduler over injected store handles
    #[must_use]
    pub fn new(
        store: Arc<dyn PatientStore>,
        replica: Arc<ReplicaStore>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            replica,
            interval,
        }
    }

    /// Run one sync pass across every replicated domain
    ///
    /// Pulls run concurrently; each domain's failure is contained and
    /// reported. Afterwards the last-sync timestamp and per-domain row
    /// counts land in `meta`.
    pub async fn sync_once(&self) -> SyncReport {
        let pulls = ReplicaDomain::ALL.map(|domain| {
            let store = Arc::clone(&self.store);
            let replica = Arc::clone(&self.replica);
            async move {
                let rows = store
                    .all_rows(domain.source_table(), domain.sync_limit())
                    .await
                    .map_err(|err| (domain, err.to_string()))?;
                let stored = replica
                    .bulk_upsert(domain, &rows)
                    .map_err(|err| (domain, err.to_string()))?;
                Ok::<_, (ReplicaDomain, String)>((domain, stored))
            }
        });

        let mut report = SyncReport::default();
        for result in join_all(pulls).await {
            match result {
                Ok((domain, stored)) => {
                    debug!("synced {stored} rows into {domain}");
                    report.synced.push((domain, stored));
                }
                Err((domain, message)) => {
                    warn!("sync of {domain} failed: {message}");
                    report.failed.push((domain, message));
                }
            }
        }

        self.record_bookkeeping(&report);
        info!(
            "sync pass complete: {} domain(s) landed, {} failed",
            report.synced.len(),
            report.failed.len()
        );
        report
    }

    /// Run `sync_once` forever on a fixed interval
    ///
    /// The first pass fires immediately. Abort the returned handle to
    /// stop.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sync_once().await;
            }
        })
    }

    /// Replica health, degraded to unavailable when it cannot answer
    #[must_use]
    pub fn status(&self) -> CacheStatus {
        self.replica
            .status()
            .unwrap_or_else(|err| CacheStatus::unavailable(err.to_string()))
    }

    fn record_bookkeeping(&self, report: &SyncReport) {
        if let Err(err) = self
            .replica
            .set_meta(LAST_SYNC_KEY, &Value::String(Utc::now().to_rfc3339()))
        {
            warn!("failed to record sync timestamp: {err}");
        }
        for (domain, stored) in &report.synced {
            let key = format!("rows:{}", domain.collection());
            if let Err(err) = self.replica.set_meta(&key, &json!(stored)) {
                warn!("failed to record row count for {domain}: {err}");
            }
        }
    }
}
