//! In-process client metrics.
//!
//! Counters, gauges and histograms are stored as atomics in `DashMap`s and
//! rendered in Prometheus text format on demand.

pub mod metrics;
