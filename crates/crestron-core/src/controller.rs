// ── Controller abstraction ──
//
// Full lifecycle management for one Crestron Home processor: owns the API
// client, the snapshot store, the poll orchestrator, and the command
// gateway. Spawns the periodic poll task and tears it down on shutdown.

use std::sync::Arc;
use std::time::Duration;

use crestron_api::CwsClient;
use tokio::sync::{Mutex, Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::CwsApi;
use crate::command::{Command, CommandGateway};
use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::model::{CompositeId, Device, Subtype};
use crate::poll::{PollOrchestrator, PollOutcome, PollReport, PollStatus};
use crate::store::{Snapshot, SnapshotStore};

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Construct, call
/// [`start()`](Self::start), then read devices from the snapshot or send
/// commands.
pub struct Controller<A: CwsApi = CwsClient> {
    inner: Arc<ControllerInner<A>>,
}

impl<A: CwsApi> Clone for Controller<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<A> {
    config: BridgeConfig,
    store: Arc<SnapshotStore>,
    orchestrator: Arc<PollOrchestrator<A>>,
    gateway: CommandGateway<A>,
    /// Wakes the poll task ahead of its next tick.
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller<CwsClient> {
    /// Build a controller talking to a real processor. Does NOT connect;
    /// call [`start()`](Self::start).
    pub fn new(config: BridgeConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let client = CwsClient::new(&config.host, config.token.clone(), &config.transport())?;
        Ok(Self::with_api(config, Arc::new(client)))
    }
}

impl<A: CwsApi> Controller<A> {
    /// Build a controller over any [`CwsApi`] implementation.
    pub fn with_api(config: BridgeConfig, api: Arc<A>) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let refresh = Arc::new(Notify::new());
        let orchestrator = Arc::new(PollOrchestrator::new(
            Arc::clone(&api),
            Arc::clone(&store),
            &config,
        ));
        let gateway = CommandGateway::new(api, Arc::clone(&store), Arc::clone(&refresh));

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                orchestrator,
                gateway,
                refresh,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Run the first poll and spawn the periodic poll task.
    ///
    /// A rejected token fails startup with
    /// [`CoreError::Authentication`]; any other first-poll failure is
    /// logged and left to the periodic task to retry.
    pub async fn start(&self) -> Result<(), CoreError> {
        if let Some(report) = self.inner.orchestrator.poll().await {
            if report.outcome == PollOutcome::Failed {
                if let Some(auth) = report.failures.iter().find(|f| f.error.is_auth()) {
                    return Err(auth.error.clone());
                }
                warn!(
                    failures = report.failures.len(),
                    "initial poll failed, will retry on schedule"
                );
            } else {
                info!(devices = report.device_count, outcome = %report.outcome, "initial poll complete");
            }
        }

        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("poll task already running");
            return Ok(());
        }
        handles.push(tokio::spawn(poll_task(
            Arc::clone(&self.inner.orchestrator),
            Arc::clone(&self.inner.refresh),
            self.inner.config.poll_interval,
            self.inner.cancel.clone(),
        )));
        Ok(())
    }

    /// Stop the poll task and drop any pending debounced commands.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.gateway.cancel_pending();
        debug!("controller shut down");
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Poll now and wait for the result. `None` if a poll was already in
    /// flight.
    pub async fn refresh(&self) -> Option<Arc<PollReport>> {
        self.inner.orchestrator.poll().await
    }

    pub fn status(&self) -> watch::Receiver<PollStatus> {
        self.inner.orchestrator.status()
    }

    pub fn current_status(&self) -> PollStatus {
        self.inner.orchestrator.current_status()
    }

    /// Reports of every completed poll.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PollReport>> {
        self.inner.orchestrator.subscribe()
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn get(&self, id: &CompositeId) -> Result<Arc<Device>, CoreError> {
        self.inner.store.get(id)
    }

    pub fn get_by_type(&self, subtype: Subtype) -> Arc<[Arc<Device>]> {
        self.inner.store.get_by_type(subtype)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.snapshot()
    }

    // ── Commands ─────────────────────────────────────────────────

    pub async fn send_command(&self, id: &CompositeId, command: Command) -> Result<(), CoreError> {
        self.inner.gateway.send_command(id, command).await
    }

    /// Debounced commands not yet sent upstream.
    pub fn pending_commands(&self) -> usize {
        self.inner.gateway.pending_count()
    }

    /// Wait until every debounced command has been sent or dropped.
    ///
    /// Fails with the first upstream error a debounced send hit since the
    /// last flush.
    pub async fn flush_commands(&self) -> Result<(), CoreError> {
        self.inner.gateway.flush().await
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn poll_task<A: CwsApi>(
    orchestrator: Arc<PollOrchestrator<A>>,
    refresh: Arc<Notify>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await; // the initial poll already ran

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            () = refresh.notified() => {
                debug!("refresh requested");
                ticker.reset();
            }
        }

        if orchestrator.poll().await.is_none() {
            debug!("skipped overlapping poll");
        }
    }
}
