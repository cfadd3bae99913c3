//! Chartsync aggregator
//!
//! Server side of the patient data layer:
//! - [`AggregatorService`]: assembles one patient's full record set from
//!   ~20 tables in a single concurrent fan-out, and applies whitelisted
//!   mutations against the backing store
//! - [`http`]: the JSON surface mounted at `/patient-data`

pub mod http;
pub mod service;

pub use http::{router, ApiError};
pub use service::{AggregateError, AggregatorService};
