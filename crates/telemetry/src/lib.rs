//! Request counters and provider usage for ragpack.
//!
//! One [`Metrics`] instance is created by whoever owns the request layer and
//! passed around by handle. The retrieval pipeline never touches it.

pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot, ProviderStats};
