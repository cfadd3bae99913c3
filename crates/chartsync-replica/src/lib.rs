//! Chartsync replica
//!
//! Durable local mirror of the backend working set, so read paths keep
//! answering when the aggregator is unreachable:
//! - [`ReplicaStore`]: versioned SQLite database, one collection per
//!   replicated domain plus sync bookkeeping
//! - [`SyncScheduler`]: periodic bulk pull from the backing store
//!
//! All reads serve the most recent successful sync; there is no live
//! reconciliation.

pub mod domain;
pub mod store;
pub mod sync;

pub use domain::ReplicaDomain;
pub use store::{CacheStatus, MetaRecord, ReplicaError, ReplicaStore};
pub use sync::{SyncReport, SyncScheduler};
