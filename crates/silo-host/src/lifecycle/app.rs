//! Application handle: process store owner, service accessors, and ordered
//! start/stop callbacks.
//!
//! There is no global instance. Bootstrap builds exactly one [`App`] and hands
//! clones of it to whatever needs service lookup; all clones share one inner
//! state.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use silo_core::error::{panic_message, Result, SiloError};
use silo_core::{DataStore, DateTimeProvider, Logger, LoggerFactory, ServiceContainer};

use crate::config::AppConfig;
use crate::jobs::JobManager;
use crate::keys;
use crate::lifecycle::shutdown::CancelToken;

type Callback = Box<dyn Fn() -> Result<()> + Send + Sync>;

struct NamedCallback {
    name: String,
    run: Callback,
}

impl NamedCallback {
    /// Run the callback, turning a panic into an error.
    fn invoke(&self) -> Result<()> {
        match catch_unwind(AssertUnwindSafe(|| (self.run)())) {
            Ok(res) => res,
            Err(payload) => Err(SiloError::Internal(format!(
                "panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Configured = 0,
    Starting = 1,
    Started = 2,
    Failed = 3,
    Stopping = 4,
    Stopped = 5,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Configured => "configured",
            Phase::Starting => "starting",
            Phase::Started => "started",
            Phase::Failed => "failed",
            Phase::Stopping => "stopping",
            Phase::Stopped => "stopped",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Phase::Configured,
            1 => Phase::Starting,
            2 => Phase::Started,
            3 => Phase::Failed,
            4 => Phase::Stopping,
            _ => Phase::Stopped,
        }
    }
}

/// Outcome of [`App::stopping`]. Faults never stop later callbacks.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub ran: usize,
    pub faults: Vec<SiloError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Configuration phase: collect callbacks, then freeze them with `build`.
pub struct AppBuilder {
    store: DataStore,
    on_start: Vec<NamedCallback>,
    on_stop: Vec<NamedCallback>,
    cancel: CancelToken,
}

impl AppBuilder {
    pub fn new(store: DataStore) -> Self {
        Self {
            store,
            on_start: Vec::new(),
            on_stop: Vec::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Store being populated; shared with the built app.
    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Use an existing token (e.g. one already handed to the job pool).
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn on_start<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.on_start.push(NamedCallback {
            name: name.into(),
            run: Box::new(f),
        });
        self
    }

    pub fn on_stop<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.on_stop.push(NamedCallback {
            name: name.into(),
            run: Box::new(f),
        });
        self
    }

    pub fn build(self) -> App {
        tracing::debug!(
            on_start = self.on_start.len(),
            on_stop = self.on_stop.len(),
            entries = self.store.len(),
            "application configured"
        );
        App {
            inner: Arc::new(AppInner {
                store: self.store,
                on_start: self.on_start.into_boxed_slice(),
                on_stop: self.on_stop.into_boxed_slice(),
                phase: AtomicU8::new(Phase::Configured as u8),
                cancel: self.cancel,
            }),
        }
    }
}

#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

struct AppInner {
    store: DataStore,
    on_start: Box<[NamedCallback]>,
    on_stop: Box<[NamedCallback]>,
    phase: AtomicU8,
    cancel: CancelToken,
}

impl App {
    pub fn store(&self) -> &DataStore {
        &self.inner.store
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.inner.phase.load(Ordering::Acquire))
    }

    /// True once startup completed and shutdown has not begun.
    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Started
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.inner.cancel.clone()
    }

    // --------------------
    // Service accessors
    // --------------------

    pub fn application_name(&self) -> Result<String> {
        self.store()
            .fetch_cloned(&keys::APPLICATION_NAME)
            .map_err(|e| e.into_service_error("application_name"))
    }

    pub fn date_time_provider(&self) -> Result<Arc<dyn DateTimeProvider>> {
        self.store()
            .fetch_cloned(&keys::DATE_TIME_PROVIDER)
            .map_err(|e| e.into_service_error("date_time_provider"))
    }

    pub fn logger_factory(&self) -> Result<Arc<dyn LoggerFactory>> {
        self.store()
            .fetch_cloned(&keys::LOGGER_FACTORY)
            .map_err(|e| e.into_service_error("logger_factory"))
    }

    /// Named logger from the configured factory.
    pub fn logger(&self, category: &str) -> Result<Logger> {
        Ok(self.logger_factory()?.create_logger(category))
    }

    pub fn configuration(&self) -> Result<Arc<AppConfig>> {
        self.store()
            .fetch(&keys::CONFIGURATION)
            .map_err(|e| e.into_service_error("configuration"))
    }

    pub fn service_provider(&self) -> Result<Arc<ServiceContainer>> {
        self.store()
            .fetch(&keys::SERVICE_PROVIDER)
            .map_err(|e| e.into_service_error("service_provider"))
    }

    pub fn background_job_manager(&self) -> Result<Arc<JobManager>> {
        self.service_provider()?
            .try_resolve::<JobManager>()
            .ok_or(SiloError::ServiceNotConfigured {
                service: "background_job_manager",
            })
    }

    // --------------------
    // Lifecycle
    // --------------------

    /// Run on-start callbacks in registration order. The first fault aborts
    /// startup; the app is then `Failed` and only `stopping` is accepted.
    pub fn started(&self) -> Result<()> {
        self.advance(&[Phase::Configured], Phase::Starting, "start")?;
        tracing::info!(callbacks = self.inner.on_start.len(), "application starting");

        for cb in self.inner.on_start.iter() {
            if let Err(e) = cb.invoke() {
                self.set_phase(Phase::Failed);
                tracing::error!(callback = %cb.name, error = %e, "startup callback failed, aborting startup");
                return Err(SiloError::StartupFault {
                    callback: cb.name.clone(),
                    source: Box::new(e),
                });
            }
            tracing::debug!(callback = %cb.name, "startup callback done");
        }

        self.set_phase(Phase::Started);
        tracing::info!("application started");
        Ok(())
    }

    /// Signal cancellation, then run every on-stop callback in registration
    /// order regardless of earlier faults.
    pub fn stopping(&self) -> Result<ShutdownReport> {
        self.advance(&[Phase::Started, Phase::Failed], Phase::Stopping, "stop")?;
        tracing::info!(callbacks = self.inner.on_stop.len(), "application stopping");
        self.inner.cancel.cancel();

        let mut report = ShutdownReport::default();
        for cb in self.inner.on_stop.iter() {
            report.ran += 1;
            match cb.invoke() {
                Ok(()) => tracing::debug!(callback = %cb.name, "shutdown callback done"),
                Err(e) => {
                    tracing::error!(callback = %cb.name, error = %e, "shutdown callback failed, continuing");
                    report.faults.push(SiloError::ShutdownFault {
                        callback: cb.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Final hook after shutdown callbacks and job draining. Currently only
    /// records the phase.
    pub fn stopped(&self) -> Result<()> {
        self.advance(&[Phase::Stopping], Phase::Stopped, "finish stopping")?;
        tracing::info!("application stopped");
        Ok(())
    }

    fn set_phase(&self, phase: Phase) {
        self.inner.phase.store(phase as u8, Ordering::Release);
    }

    fn advance(&self, from: &[Phase], to: Phase, op: &'static str) -> Result<()> {
        for &f in from {
            if self
                .inner
                .phase
                .compare_exchange(f as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(());
            }
        }
        Err(SiloError::InvalidPhase {
            op,
            phase: self.phase().as_str(),
        })
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("phase", &self.phase())
            .field("store", &self.inner.store)
            .field("on_start", &self.inner.on_start.len())
            .field("on_stop", &self.inner.on_stop.len())
            .finish()
    }
}
