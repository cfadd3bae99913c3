//! Debounced save timers
//!
//! One pending timer per `(table, row)` key. Scheduling a key that
//! already has a timer aborts the old one and restarts the quiet period,
//! so rapid repeated saves coalesce into the last value. Teardown must
//! cancel everything; a disposed queue accepts no new work.

use chartsync_domain::Table;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Quiet period before a queued save fires
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(2);

/// Key of one pending save
pub(crate) type SaveKey = (Table, String);

struct PendingSave {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Map of abortable debounce timers
pub struct SaveQueue {
    timers: DashMap<SaveKey, PendingSave>,
    next_generation: AtomicU64,
    quiet_period: Duration,
    disposed: AtomicBool,
}

impl SaveQueue {
    /// Create a queue with the given quiet period
    #[must_use]
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            timers: DashMap::new(),
            next_generation: AtomicU64::new(0),
            quiet_period,
            disposed: AtomicBool::new(false),
        }
    }

    /// Quiet period timers wait before firing
    #[inline]
    #[must_use]
    pub const fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// True once [`Self::dispose`] has run
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Number of timers still pending
    #[must_use]
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Reserve a generation for the next timer
    pub(crate) fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a spawned timer, aborting any previous one for the key
    pub(crate) fn replace(&self, key: SaveKey, generation: u64, handle: JoinHandle<()>) {
        if let Some(previous) = self.timers.insert(key, PendingSave { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Drop a timer's registration as it fires
    ///
    /// Generation-checked so a stale timer cannot unregister its
    /// replacement.
    pub(crate) fn finish(&self, key: &SaveKey, generation: u64) {
        self.timers
            .remove_if(key, |_, pending| pending.generation == generation);
    }

    /// Cancel every pending timer and refuse further scheduling
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        for entry in self.timers.iter() {
            entry.value().handle.abort();
        }
        self.timers.clear();
    }
}

impl Drop for SaveQueue {
    fn drop(&mut self) {
        for entry in self.timers.iter() {
            entry.value().handle.abort();
        }
    }
}
