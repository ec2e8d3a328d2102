//! Standard process wiring.
//!
//! `bootstrap` fills the store with the well-known services and returns an
//! [`AppBuilder`] whose first on-start callback starts the job pool and whose
//! first on-stop callback closes job intake. Callers append their own
//! callbacks before `build()`.

use std::sync::Arc;

use silo_core::error::Result;
use silo_core::{
    DataStore, DateTimeProvider, LoggerFactory, ServiceContainer, SystemClock,
    TracingLoggerFactory,
};

use crate::config::AppConfig;
use crate::jobs::JobManager;
use crate::keys;
use crate::lifecycle::{App, AppBuilder, CancelToken, ShutdownReport};

pub fn bootstrap(cfg: AppConfig) -> Result<AppBuilder> {
    cfg.validate()?;

    let store = DataStore::new();
    let cancel = CancelToken::new();
    let name = cfg.app.name.clone();

    store.put(&keys::APPLICATION_NAME, name.clone());
    store.put(
        &keys::DATE_TIME_PROVIDER,
        Arc::new(SystemClock) as Arc<dyn DateTimeProvider>,
    );
    store.put(
        &keys::LOGGER_FACTORY,
        Arc::new(TracingLoggerFactory::with_prefix(name.clone())) as Arc<dyn LoggerFactory>,
    );

    let jobs = Arc::new(JobManager::new(cfg.jobs.clone(), cancel.clone()));
    let services = ServiceContainer::new();
    services.provide(Arc::clone(&jobs));
    store.put_shared(&keys::SERVICE_PROVIDER, Arc::new(services));
    store.put_shared(&keys::CONFIGURATION, Arc::new(cfg));

    tracing::info!(app = %name, entries = store.len(), "process store populated");

    let start_jobs = Arc::clone(&jobs);
    Ok(AppBuilder::new(store)
        .with_cancel_token(cancel)
        .on_start("jobs.start", move || start_jobs.start())
        .on_stop("jobs.close", move || {
            jobs.close();
            Ok(())
        }))
}

/// Full shutdown sequence: `stopping`, drain the job pool within
/// `jobs.drain_timeout_ms`, then `stopped`.
pub async fn shutdown(app: &App) -> Result<ShutdownReport> {
    let report = app.stopping()?;
    if !report.is_clean() {
        tracing::warn!(faults = report.faults.len(), "shutdown callbacks reported faults");
    }

    match app.background_job_manager() {
        Ok(jobs) => {
            jobs.shutdown().await;
        }
        Err(e) => tracing::debug!(error = %e, "no job pool to drain"),
    }

    app.stopped()?;
    Ok(report)
}
