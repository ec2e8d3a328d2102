//! Observability: subscriber setup and in-process job metrics.

pub mod logging;
pub mod metrics;
