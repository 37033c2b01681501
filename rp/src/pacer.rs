//! Process-wide request pacer
//!
//! One shared [`RequestPacer`] per process owns the pending-operation queue,
//! the transport session, and the batch scheduler loop. `configure()` builds
//! (or rebuilds) those resources, `get`/`get_raw` submit work, `shutdown()`
//! tears everything down idempotently, and `reset()` drops the shared
//! instance for test boundaries.

use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::PacerError;
use crate::identity;
use crate::operation::{FetchMode, FetchOperation, Payload};
use crate::queue::OperationQueue;
use crate::scheduler;

/// Process-wide shared instance; creation is serialized by the lock
static INSTANCE: Mutex<Option<Arc<RequestPacer>>> = Mutex::new(None);

/// Throttled outbound GET dispatcher
pub struct RequestPacer {
    inner: tokio::sync::Mutex<Inner>,
}

/// Mutable singleton state
///
/// Invariant: at most one live scheduler task and one live session at a
/// time. Mutated only by `configure_with` and `shutdown`.
struct Inner {
    configured: bool,
    shutdown_started: bool,
    hooks_registered: bool,
    config: Config,
    queue: Option<OperationQueue>,
    session: Option<reqwest::Client>,
    scheduler: Option<JoinHandle<()>>,
}

impl RequestPacer {
    fn new() -> Self {
        Self {
            inner: tokio::sync::Mutex::new(Inner {
                configured: false,
                shutdown_started: false,
                hooks_registered: false,
                config: Config::default(),
                queue: None,
                session: None,
                scheduler: None,
            }),
        }
    }

    /// The shared process-wide instance, created on first use
    pub fn instance() -> Arc<RequestPacer> {
        let mut slot = INSTANCE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.get_or_insert_with(|| {
            debug!("creating request pacer instance");
            Arc::new(RequestPacer::new())
        })
        .clone()
    }

    /// Drop the shared instance so the next access recreates it
    ///
    /// Intended for test boundaries only. In-flight resources are untouched;
    /// call [`RequestPacer::shutdown`] first if they should be released.
    pub fn reset() {
        info!("resetting request pacer instance");
        let mut slot = INSTANCE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }

    /// Configure the pacer with its current tuning (defaults unless
    /// [`RequestPacer::configure_with`] ran earlier)
    pub async fn configure(self: &Arc<Self>) -> Result<(), PacerError> {
        let config = self.inner.lock().await.config.clone();
        self.configure_with(config).await
    }

    /// Configure (or reconfigure) the pacer
    ///
    /// Idempotent and safe to call on every request path: a configured pacer
    /// whose scheduler is still alive is left untouched. Initialization is
    /// re-run from scratch when the pacer was never configured, or when the
    /// previously spawned scheduler task is no longer alive - which covers
    /// both a replaced runtime (the task died with it) and a scheduler loop
    /// that stopped for any other reason. The previous session and scheduler
    /// are retired before replacements are created.
    pub async fn configure_with(self: &Arc<Self>, config: Config) -> Result<(), PacerError> {
        let mut inner = self.inner.lock().await;

        let scheduler_alive = inner.scheduler.as_ref().is_some_and(|task| !task.is_finished());
        if inner.configured && scheduler_alive {
            debug!("already configured with a live scheduler");
            return Ok(());
        }

        if let Some(task) = inner.scheduler.take() {
            info!("reconfiguring: retiring previous scheduler and session");
            retire_scheduler(task).await;
        }
        inner.queue = None;
        inner.session = None;

        let session = reqwest::Client::builder().timeout(config.request_timeout()).build()?;
        let (queue, receiver) = OperationQueue::unbounded();
        let task = scheduler::spawn(receiver, config.clone());

        inner.session = Some(session);
        inner.queue = Some(queue);
        inner.scheduler = Some(task);
        inner.config = config;
        inner.configured = true;
        inner.shutdown_started = false;

        if !inner.hooks_registered {
            register_shutdown_hooks(Arc::downgrade(self));
            inner.hooks_registered = true;
        }

        info!("request pacer configured");
        Ok(())
    }

    /// Fetch `url`, returning the response body as text
    ///
    /// Fails with [`PacerError::NotConfigured`] when the pacer is not
    /// configured - it never configures implicitly. Transport failures
    /// propagate as [`PacerError::Transport`].
    pub async fn get(&self, url: &str) -> Result<String, PacerError> {
        Ok(self.submit(url, FetchMode::Text).await?.into_text())
    }

    /// Fetch `url`, returning the raw response bytes
    pub async fn get_raw(&self, url: &str) -> Result<Bytes, PacerError> {
        Ok(self.submit(url, FetchMode::Raw).await?.into_bytes())
    }

    /// Enqueue one operation and suspend until its broker resolves
    async fn submit(&self, url: &str, mode: FetchMode) -> Result<Payload, PacerError> {
        let (session, queue) = {
            let inner = self.inner.lock().await;
            if !inner.configured {
                return Err(PacerError::NotConfigured);
            }
            match (&inner.session, &inner.queue) {
                (Some(session), Some(queue)) => (session.clone(), queue.clone()),
                // Torn down by shutdown; a fresh configure() is required
                _ => return Err(PacerError::NotConfigured),
            }
        };

        let user_agent = identity::random_user_agent();
        let (reply, result) = oneshot::channel();
        let op = FetchOperation::new(url, user_agent, mode, session, reply);

        queue.enqueue(op)?;
        debug!(url, "GET request queued");

        match result.await {
            Ok(outcome) => outcome,
            Err(_) => Err(PacerError::Abandoned),
        }
    }

    /// Tear down the scheduler loop and release the transport session
    ///
    /// Idempotent: repeated calls after the first are no-ops. Operations
    /// still queued when shutdown begins are abandoned and their callers see
    /// [`PacerError::Abandoned`]; operations already dispatched into a batch
    /// run to completion.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if inner.shutdown_started {
            debug!("shutdown already started");
            return;
        }
        inner.shutdown_started = true;
        info!("initiating shutdown");

        if let Some(task) = inner.scheduler.take() {
            retire_scheduler(task).await;
        }
        inner.queue = None;
        if inner.session.take().is_some() {
            info!("session closed");
        }
    }
}

/// Cancel a scheduler task and wait until the cancellation has landed
///
/// Cancellation is the expected outcome here, not an error.
async fn retire_scheduler(task: JoinHandle<()>) {
    task.abort();
    match task.await {
        Ok(()) => debug!("scheduler already stopped"),
        Err(err) if err.is_cancelled() => debug!("scheduler task cancelled"),
        Err(err) => warn!(error = %err, "scheduler task failed while stopping"),
    }
}

/// Arrange for process termination signals to trigger shutdown
///
/// Holds only a weak handle so a reset instance can be dropped while the
/// listener is still parked on the signal.
fn register_shutdown_hooks(pacer: Weak<RequestPacer>) {
    tokio::spawn(async move {
        wait_for_termination().await;
        info!("shutdown signal received");
        if let Some(pacer) = pacer.upgrade() {
            pacer.shutdown().await;
        }
    });
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
        (Ok(mut interrupt), Ok(mut terminate)) => {
            tokio::select! {
                _ = interrupt.recv() => debug!("interrupt signal received"),
                _ = terminate.recv() => debug!("terminate signal received"),
            }
        }
        _ => {
            // Stream registration can fail on unsupported hosts; degrade to
            // the portable handler rather than giving up on shutdown hooks
            warn!("signal stream registration failed; falling back to ctrl-c");
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "ctrl-c handler unavailable");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler unavailable");
    }
}
