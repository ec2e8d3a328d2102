//! Background job pool.
//!
//! Submissions go into one bounded queue and return immediately. A fixed set
//! of worker tasks share the receiver. Delayed jobs, retries, and recurring
//! schedules are timer tasks that feed the same queue when they fire.
//!
//! Intake closes as soon as either `close` is called or the cancel token
//! fires. On cancellation workers keep pulling until the queue is empty, then
//! exit; timers drop whatever they were holding and record it as `dropped`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use silo_core::error::{panic_message, Result, SiloError};

use crate::config::JobsConfig;
use crate::jobs::job::{FnJob, Job, JobContext, JobId, JobOptions};
use crate::lifecycle::CancelToken;
use crate::obs::metrics::JobMetrics;

struct Envelope {
    id: JobId,
    job: Arc<dyn Job>,
    attempt: u32,
    max_attempts: u32,
    backoff: Duration,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub retried: u64,
    /// delayed jobs and pending retries discarded by shutdown
    pub dropped: u64,
    pub rejected: u64,
    pub in_flight: i64,
    pub queued: usize,
    pub scheduled: usize,
}

pub struct JobManager {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

struct Shared {
    cfg: JobsConfig,
    tx: mpsc::Sender<Envelope>,
    rx: tokio::sync::Mutex<mpsc::Receiver<Envelope>>,
    accepting: AtomicBool,
    started: AtomicBool,
    // timers holding a job that has not reached the queue yet
    scheduled: AtomicUsize,
    cancel: CancelToken,
    metrics: Arc<JobMetrics>,
}

impl JobManager {
    pub fn new(cfg: JobsConfig, cancel: CancelToken) -> Self {
        let (tx, rx) = mpsc::channel(cfg.queue_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                cfg,
                tx,
                rx: tokio::sync::Mutex::new(rx),
                accepting: AtomicBool::new(true),
                started: AtomicBool::new(false),
                scheduled: AtomicUsize::new(0),
                cancel,
                metrics: Arc::new(JobMetrics::default()),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &JobsConfig {
        &self.shared.cfg
    }

    pub fn metrics(&self) -> Arc<JobMetrics> {
        Arc::clone(&self.shared.metrics)
    }

    /// False once `close` was called or the cancel token fired.
    pub fn is_accepting(&self) -> bool {
        self.shared.is_accepting()
    }

    /// Spawn the worker pool. Must run inside a tokio runtime; calling it
    /// again is a no-op.
    pub fn start(&self) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| SiloError::Internal(format!("job pool needs a tokio runtime: {e}")))?;
        if self.shared.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let n = self.shared.cfg.workers.max(1);
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        for worker in 0..n {
            workers.push(handle.spawn(worker_loop(Arc::clone(&self.shared), worker)));
        }
        tracing::info!(workers = n, queue_capacity = self.shared.cfg.queue_capacity, "job pool started");
        Ok(())
    }

    pub fn submit(&self, job: Arc<dyn Job>) -> Result<JobId> {
        self.submit_with(job, JobOptions::default())
    }

    pub fn submit_fn<F, Fut>(&self, name: impl Into<String>, f: F) -> Result<JobId>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.submit(Arc::new(FnJob::new(name, f)))
    }

    /// Enqueue `job` and return its id without waiting for it to run.
    pub fn submit_with(&self, job: Arc<dyn Job>, opts: JobOptions) -> Result<JobId> {
        let name = job.name().to_string();
        if !self.is_accepting() {
            self.shared.metrics.rejected.inc(&[("reason", "shutting_down")]);
            return Err(SiloError::ShuttingDown);
        }

        let env = Envelope {
            id: JobId::new(),
            job,
            attempt: 1,
            max_attempts: opts.max_attempts.unwrap_or(self.shared.cfg.max_attempts).max(1),
            backoff: opts
                .retry_backoff
                .unwrap_or(Duration::from_millis(self.shared.cfg.retry_backoff_ms)),
        };
        let id = env.id;

        match opts.delay.filter(|d| !d.is_zero()) {
            Some(delay) => Arc::clone(&self.shared).schedule_after(env, delay)?,
            None => self.shared.enqueue(env)?,
        }

        self.shared.metrics.submitted.inc(&[("job", &name)]);
        tracing::debug!(job_id = %id, job = %name, "job submitted");
        Ok(id)
    }

    /// Run `job` every `interval` until shutdown. Ticks that find the queue
    /// full are skipped. Returns the schedule id; each run gets its own id.
    pub fn schedule_every(&self, job: Arc<dyn Job>, interval: Duration) -> Result<JobId> {
        if interval.is_zero() {
            return Err(SiloError::Config("recurring interval must be non-zero".into()));
        }
        if !self.is_accepting() {
            return Err(SiloError::ShuttingDown);
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| SiloError::Internal(format!("scheduling needs a tokio runtime: {e}")))?;

        let schedule_id = JobId::new();
        let shared = Arc::clone(&self.shared);
        tracing::info!(schedule_id = %schedule_id, job = %job.name(), ?interval, "recurring job scheduled");

        handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shared.cancel.cancelled() => break,
                }
                if !shared.is_accepting() {
                    break;
                }

                let env = Envelope {
                    id: JobId::new(),
                    job: Arc::clone(&job),
                    attempt: 1,
                    max_attempts: 1,
                    backoff: Duration::ZERO,
                };
                match shared.enqueue(env) {
                    Ok(()) => shared.metrics.submitted.inc(&[("job", job.name())]),
                    Err(SiloError::QueueFull) => {
                        tracing::warn!(schedule_id = %schedule_id, job = %job.name(), "queue full, skipping tick");
                    }
                    Err(_) => break,
                }
            }
            tracing::debug!(schedule_id = %schedule_id, "recurring schedule ended");
        });

        Ok(schedule_id)
    }

    /// Stop accepting new submissions. Queued work still runs.
    pub fn close(&self) {
        if self.shared.accepting.swap(false, Ordering::AcqRel) {
            tracing::info!(queued = self.shared.queued(), "job intake closed");
        }
    }

    /// Close intake, signal cancellation, and wait up to `grace` for workers
    /// to empty the queue. Stragglers are aborted. Anything still queued once
    /// the workers are gone is discarded as `dropped`. Returns true only if
    /// every queued job ran.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.close();
        self.shared.cancel.cancel();

        let handles = std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        let deadline = Instant::now() + grace;
        let mut clean = true;

        for mut h in handles {
            if tokio::time::timeout_at(deadline, &mut h).await.is_err() {
                h.abort();
                clean = false;
            }
        }

        let leftover = self.shared.discard_queued().await;
        if leftover > 0 {
            tracing::warn!(leftover, "queued jobs left behind by exiting workers");
            clean = false;
        }

        if clean {
            tracing::info!("job pool drained");
        } else {
            tracing::warn!(?grace, queued = self.shared.queued(), "job pool drain timed out, workers aborted");
        }
        clean
    }

    /// [`JobManager::drain`] with `jobs.drain_timeout_ms`.
    pub async fn shutdown(&self) -> bool {
        self.drain(Duration::from_millis(self.shared.cfg.drain_timeout_ms)).await
    }

    pub fn stats(&self) -> JobStats {
        let m = &self.shared.metrics;
        JobStats {
            submitted: m.submitted.total(),
            succeeded: m.completed.total_where("outcome", "ok"),
            failed: m.completed.total_where("outcome", "failed"),
            retried: m.retries.total(),
            dropped: m.completed.total_where("outcome", "dropped"),
            rejected: m.rejected.total(),
            in_flight: m.in_flight.total(),
            queued: self.shared.queued(),
            scheduled: self.shared.scheduled.load(Ordering::Relaxed),
        }
    }
}

impl Shared {
    fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire) && !self.cancel.is_cancelled()
    }

    fn record_dropped(&self, job: &str) {
        self.metrics.completed.inc(&[("job", job), ("outcome", "dropped")]);
    }

    /// Empty the queue without running anything. Only meaningful once the
    /// workers have exited.
    async fn discard_queued(&self) -> usize {
        let mut rx = self.rx.lock().await;
        let mut n = 0;
        while let Ok(env) = rx.try_recv() {
            tracing::warn!(job_id = %env.id, job = %env.job.name(), "queued job dropped on shutdown");
            self.record_dropped(env.job.name());
            n += 1;
        }
        n
    }

    fn enqueue(&self, env: Envelope) -> Result<()> {
        match self.tx.try_send(env) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(env)) => {
                self.metrics.rejected.inc(&[("reason", "queue_full")]);
                tracing::warn!(job_id = %env.id, job = %env.job.name(), "job queue full");
                Err(SiloError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.rejected.inc(&[("reason", "shutting_down")]);
                Err(SiloError::ShuttingDown)
            }
        }
    }

    /// Hold `env` on a timer, then enqueue it. Dropped if cancellation wins.
    fn schedule_after(self: Arc<Self>, env: Envelope, delay: Duration) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| SiloError::Internal(format!("delayed job needs a tokio runtime: {e}")))?;

        self.scheduled.fetch_add(1, Ordering::Relaxed);
        handle.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let (id, name) = (env.id, env.job.name().to_string());
                    if let Err(e) = self.enqueue(env) {
                        self.record_dropped(&name);
                        tracing::error!(job_id = %id, job = %name, error = %e, "delayed job could not be queued");
                    }
                }
                _ = self.cancel.cancelled() => {
                    self.record_dropped(env.job.name());
                    tracing::debug!(job_id = %env.id, job = %env.job.name(), "delayed job dropped on shutdown");
                }
            }
            self.scheduled.fetch_sub(1, Ordering::Relaxed);
        });
        Ok(())
    }

    async fn execute(self: &Arc<Self>, env: Envelope, worker: usize) {
        let name: Arc<str> = Arc::from(env.job.name());
        let labels = [("job", &*name)];
        let ctx = JobContext::new(env.id, Arc::clone(&name), env.attempt, self.cancel.clone());

        self.metrics.in_flight.inc(&labels);
        let started = Instant::now();
        let res = std::panic::AssertUnwindSafe(env.job.run(ctx))
            .catch_unwind()
            .await;
        self.metrics.in_flight.dec(&labels);
        self.metrics.run_duration.observe(&labels, started.elapsed());

        let fault = match res {
            Ok(Ok(())) => {
                self.metrics.completed.inc(&[("job", &*name), ("outcome", "ok")]);
                tracing::debug!(worker, job_id = %env.id, job = %name, attempt = env.attempt, "job done");
                return;
            }
            Ok(Err(e)) => e,
            Err(payload) => SiloError::job(&*name, format!("panicked: {}", panic_message(payload.as_ref()))),
        };

        if env.attempt < env.max_attempts && !self.cancel.is_cancelled() {
            self.metrics.retries.inc(&labels);
            tracing::warn!(
                worker, job_id = %env.id, job = %name, attempt = env.attempt,
                max_attempts = env.max_attempts, error = %fault, "job failed, retrying"
            );
            let backoff = env.backoff;
            let retry = Envelope {
                attempt: env.attempt + 1,
                ..env
            };
            let requeued = if backoff.is_zero() {
                self.enqueue(retry)
            } else {
                Arc::clone(self).schedule_after(retry, backoff)
            };
            if let Err(e) = requeued {
                self.metrics.completed.inc(&[("job", &*name), ("outcome", "failed")]);
                tracing::error!(job = %name, error = %e, "job retry could not be queued");
            }
            return;
        }

        self.metrics.completed.inc(&[("job", &*name), ("outcome", "failed")]);
        tracing::error!(
            worker, job_id = %env.id, job = %name, attempt = env.attempt, error = %fault, "job failed"
        );
    }
}

async fn worker_loop(shared: Arc<Shared>, worker: usize) {
    tracing::debug!(worker, "job worker started");
    loop {
        let next = {
            let mut rx = shared.rx.lock().await;
            let received = tokio::select! {
                biased;
                env = rx.recv() => Some(env),
                _ = shared.cancel.cancelled() => None,
            };
            match received {
                Some(env) => env,
                // cancelled: take what is left, exit once empty
                None => rx.try_recv().ok(),
            }
        };
        let Some(env) = next else { break };
        shared.execute(env, worker).await;
    }
    tracing::debug!(worker, "job worker exiting");
}
