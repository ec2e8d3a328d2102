//! Background job coordinator.
//!
//! Request-side code submits work through [`JobManager`] (resolved via
//! `App::background_job_manager`) and never waits for it to run.

pub mod job;
pub mod manager;

pub use job::{FnJob, Job, JobContext, JobId, JobOptions};
pub use manager::{JobManager, JobStats};
