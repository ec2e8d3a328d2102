//! Lifecycle management.
//!
//! # Flow
//! ```text
//! AppBuilder (populate store, register on_start / on_stop)
//!     → build()   callbacks frozen
//!     → started() on_start in order, fail fast
//!     → ... serve ...
//!     → stopping() cancel token fired, on_stop in order, best effort
//!     → JobManager::drain(grace)
//!     → stopped()
//! ```

pub mod app;
pub mod shutdown;

pub use app::{App, AppBuilder, Phase, ShutdownReport};
pub use shutdown::CancelToken;
