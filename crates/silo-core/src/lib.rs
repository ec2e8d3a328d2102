//! silo core: the process store, service container, and shared error type.
//!
//! This crate holds the runtime-agnostic pieces of the application core:
//! the typed key/value [`DataStore`] used for service location, the
//! [`ServiceContainer`], and the date/time and logger-factory service
//! abstractions. It carries no async runtime so it can be reused by any host.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible
//! path surfaces as `SiloError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod clock;
pub mod error;
pub mod logging;
pub mod services;
pub mod store;

/// Shared result type.
pub use error::{ErrorCode, Result, SiloError};

pub use clock::{DateTimeProvider, FixedClock, SystemClock};
pub use logging::{Logger, LoggerFactory, TracingLoggerFactory};
pub use services::ServiceContainer;
pub use store::{DataStore, Key};
