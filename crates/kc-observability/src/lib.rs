//! # kc-observability
//!
//! Logging and metrics infrastructure for Cluster Claimer.
//!
//! This crate provides structured logging with tracing, the [`lease_span!`]
//! macro used around lease operations, and a Prometheus recorder for the
//! lease counters emitted by the allocator.

pub mod logging;
pub mod metrics;

pub use logging::{try_init_logging, LoggingConfig, LoggingError};
pub use metrics::{init_metrics, register_metrics, MetricsError};
