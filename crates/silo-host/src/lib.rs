//! silo host library entry.
//!
//! Wires the process store from `silo-core` into a running application:
//! strict config loading, the lifecycle controller, the background job pool,
//! observability, and the ops endpoints. Consumed by the binary (`main.rs`)
//! and by integration tests.

pub mod bootstrap;
pub mod config;
pub mod jobs;
pub mod keys;
pub mod lifecycle;
pub mod obs;
pub mod ops;
pub mod router;

pub use bootstrap::{bootstrap, shutdown};
pub use jobs::{Job, JobContext, JobId, JobManager, JobOptions};
pub use lifecycle::{App, AppBuilder, CancelToken, Phase, ShutdownReport};
