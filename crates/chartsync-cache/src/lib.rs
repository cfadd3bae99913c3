//! Chartsync client cache
//!
//! Client side of the patient data layer: one [`PatientCache`] per open
//! chart holds the latest bundle, applies mutations optimistically with
//! revert-on-failure, and coalesces save-as-you-type traffic through a
//! debounced [`SaveQueue`].

pub mod cache;
pub mod save_queue;

pub use cache::{CacheError, CacheState, PatientCache};
pub use save_queue::{SaveQueue, DEFAULT_QUIET_PERIOD};
