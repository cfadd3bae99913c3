//! Per-patient reactive cache
//!
//! Holds the latest bundle for one open chart. Mutations follow the
//! optimistic protocol: the in-memory entry changes immediately, the
//! aggregator persists in the background, and the caller gets a result
//! it must handle — on failure the optimistic change is reverted, so
//! the cache never silently diverges from the server.
//!
//! A failed load keeps whatever bundle was last known; stale data beats
//! a blanked chart.

use crate::save_queue::{SaveQueue, DEFAULT_QUIET_PERIOD};
use chartsync_aggregator::{AggregateError, AggregatorService};
use chartsync_domain::{id_matches, merge_record, PatientRecordBundle, Record, Table};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Failures surfaced by cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The owning view tore the cache down; no further work is accepted
    #[error("cache disposed")]
    Disposed,

    /// The aggregator rejected or failed the operation
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Snapshot of the cache's reactive state
#[derive(Debug, Clone, Default)]
pub struct CacheState {
    /// Latest bundle, if any load has succeeded
    pub bundle: Option<PatientRecordBundle>,
    /// True while a load is in flight
    pub loading: bool,
    /// True while any mutation is in flight
    pub saving: bool,
    /// Message of the most recent failure, cleared by a successful load
    pub error: Option<String>,
}

/// What an optimistic merge displaced, kept for revert
enum PreImage {
    /// Nothing was touched (no bundle, unrouted table, or row absent)
    Untouched,
    /// Previous value of the profile object
    Profile(Option<Record>),
    /// Previous value of one sub-collection entry
    Entry(Record),
}

/// The unified client cache for one patient
pub struct PatientCache {
    aggregator: Arc<AggregatorService>,
    patient_id: String,
    state: Arc<RwLock<CacheState>>,
    saves: Arc<SaveQueue>,
}

impl PatientCache {
    /// Create a cache bound to one patient
    #[must_use]
    pub fn new(aggregator: Arc<AggregatorService>, patient_id: impl Into<String>) -> Self {
        Self::with_quiet_period(aggregator, patient_id, DEFAULT_QUIET_PERIOD)
    }

    /// Create a cache with a custom debounce quiet period
    #[must_use]
    pub fn with_quiet_period(
        aggregator: Arc<AggregatorService>,
        patient_id: impl Into<String>,
        quiet_period: Duration,
    ) -> Self {
        Self {
            aggregator,
            patient_id: patient_id.into(),
            state: Arc::new(RwLock::new(CacheState::default())),
            saves: Arc::new(SaveQueue::new(quiet_period)),
        }
    }

    /// Patient this cache is bound to
    #[inline]
    #[must_use]
    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// Clone of the current reactive state
    pub async fn state(&self) -> CacheState {
        self.state.read().await.clone()
    }

    /// Clone of the current bundle, if loaded
    pub async fn bundle(&self) -> Option<PatientRecordBundle> {
        self.state.read().await.bundle.clone()
    }

    /// Number of debounced saves still pending
    #[must_use]
    pub fn pending_saves(&self) -> usize {
        self.saves.pending()
    }

    /// Fetch a fresh bundle and replace the in-memory snapshot wholesale
    ///
    /// On failure the previous bundle stays; only the error string moves.
    pub async fn load(&self) -> Result<(), CacheError> {
        {
            let mut state = self.state.write().await;
            state.loading = true;
        }
        let fetched = self.aggregator.fetch_bundle(&self.patient_id).await;

        let mut state = self.state.write().await;
        state.loading = false;
        match fetched {
            Ok(bundle) => {
                state.bundle = Some(bundle);
                state.error = None;
                Ok(())
            }
            Err(err) => {
                warn!("bundle load failed for {}: {err}", self.patient_id);
                state.error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Optimistically update one row
    ///
    /// The routed entry merges `updates` immediately; on success the
    /// server's canonical row merges over it, on failure the pre-image
    /// is restored and the error returned for the caller to surface.
    pub async fn update(
        &self,
        table: Table,
        id: &str,
        updates: Record,
    ) -> Result<Record, CacheError> {
        persist_update(
            Arc::clone(&self.aggregator),
            Arc::clone(&self.state),
            table,
            id.to_string(),
            updates,
        )
        .await
    }

    /// Create one row; on success it is spliced to the front of its
    /// sub-collection
    pub async fn create(&self, table: Table, record: Record) -> Result<Record, CacheError> {
        self.state.write().await.saving = true;

        let persisted = self.aggregator.create(table.table_name(), record).await;

        let mut state = self.state.write().await;
        state.saving = false;
        match persisted {
            Ok(row) => {
                if let Some(rows) = state
                    .bundle
                    .as_mut()
                    .and_then(|bundle| bundle.rows_mut(table))
                {
                    rows.insert(0, row.clone());
                }
                Ok(row)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Delete one row; on success its entry is removed from the bundle
    pub async fn delete(&self, table: Table, id: &str) -> Result<(), CacheError> {
        self.state.write().await.saving = true;

        let persisted = self.aggregator.delete(table.table_name(), id).await;

        let mut state = self.state.write().await;
        state.saving = false;
        match persisted {
            Ok(()) => {
                if let Some(rows) = state
                    .bundle
                    .as_mut()
                    .and_then(|bundle| bundle.rows_mut(table))
                {
                    rows.retain(|row| !id_matches(row, id));
                }
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Debounced save for save-as-you-type fields
    ///
    /// At most one timer per `(table, id)`; each call restarts the quiet
    /// period carrying the newest value. The fired save has no caller
    /// left to consult, so its failure is logged and recorded in the
    /// error field.
    pub fn queue_save(&self, table: Table, id: &str, updates: Record) -> Result<(), CacheError> {
        if self.saves.is_disposed() {
            return Err(CacheError::Disposed);
        }

        let key = (table, id.to_string());
        let generation = self.saves.next_generation();
        let quiet = self.saves.quiet_period();
        let saves = Arc::clone(&self.saves);
        let aggregator = Arc::clone(&self.aggregator);
        let state = Arc::clone(&self.state);
        let row_id = id.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            saves.finish(&(table, row_id.clone()), generation);
            let outcome = persist_update(
                aggregator,
                Arc::clone(&state),
                table,
                row_id.clone(),
                updates,
            )
            .await;
            if let Err(err) = outcome {
                warn!("debounced save of {table} {row_id} failed: {err}");
                state.write().await.error = Some(err.to_string());
            }
        });

        self.saves.replace(key, generation, handle);
        Ok(())
    }

    /// Cancel every pending debounced save and refuse new ones
    ///
    /// Must run on teardown of the owning view so no write fires after
    /// the view is gone.
    pub fn dispose(&self) {
        self.saves.dispose();
    }
}

/// The optimistic write protocol, shared by direct and debounced saves
async fn persist_update(
    aggregator: Arc<AggregatorService>,
    state: Arc<RwLock<CacheState>>,
    table: Table,
    id: String,
    updates: Record,
) -> Result<Record, CacheError> {
    let pre_image = {
        let mut guard = state.write().await;
        guard.saving = true;
        apply_optimistic(guard.bundle.as_mut(), table, &id, &updates)
    };

    let persisted = aggregator.update(table.table_name(), &id, updates).await;

    let mut guard = state.write().await;
    guard.saving = false;
    match persisted {
        Ok(canonical) => {
            splice_canonical(guard.bundle.as_mut(), table, &id, &canonical);
            Ok(canonical)
        }
        Err(err) => {
            debug!("update of {table} {id} failed, reverting optimistic merge");
            revert(guard.bundle.as_mut(), table, &id, pre_image);
            Err(err.into())
        }
    }
}

fn apply_optimistic(
    bundle: Option<&mut PatientRecordBundle>,
    table: Table,
    id: &str,
    updates: &Record,
) -> PreImage {
    let Some(bundle) = bundle else {
        return PreImage::Untouched;
    };
    if table == Table::Patients {
        let previous = bundle.patient.clone();
        if let Some(profile) = bundle.patient.as_mut() {
            merge_record(profile, updates);
        }
        return PreImage::Profile(previous);
    }
    let Some(rows) = bundle.rows_mut(table) else {
        return PreImage::Untouched;
    };
    match rows.iter_mut().find(|row| id_matches(row, id)) {
        Some(row) => {
            let previous = row.clone();
            merge_record(row, updates);
            PreImage::Entry(previous)
        }
        None => PreImage::Untouched,
    }
}

fn splice_canonical(
    bundle: Option<&mut PatientRecordBundle>,
    table: Table,
    id: &str,
    canonical: &Record,
) {
    let Some(bundle) = bundle else { return };
    if table == Table::Patients {
        match bundle.patient.as_mut() {
            Some(profile) => merge_record(profile, canonical),
            None => bundle.patient = Some(canonical.clone()),
        }
        return;
    }
    if let Some(rows) = bundle.rows_mut(table) {
        if let Some(row) = rows.iter_mut().find(|row| id_matches(row, id)) {
            merge_record(row, canonical);
        }
    }
}

fn revert(bundle: Option<&mut PatientRecordBundle>, table: Table, id: &str, pre_image: PreImage) {
    let Some(bundle) = bundle else { return };
    match pre_image {
        PreImage::Untouched => {}
        PreImage::Profile(previous) => bundle.patient = previous,
        PreImage::Entry(previous) => {
            if let Some(rows) = bundle.rows_mut(table) {
                if let Some(row) = rows.iter_mut().find(|row| id_matches(row, id)) {
                    *row = previous;
                }
            }
        }
    }
}
