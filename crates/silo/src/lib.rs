//! Top-level facade crate for silo.
//!
//! Re-exports the core store types and the host library so users can depend on a single crate.

pub mod core {
    pub use silo_core::*;
}

pub mod host {
    pub use silo_host::*;
}
