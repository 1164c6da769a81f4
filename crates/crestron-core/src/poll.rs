// ── Poll orchestrator ──
//
// One poll: fetch every wanted collection concurrently, normalize, swap
// the snapshot, diff against the previous one, publish a report. A failed
// collection keeps its previous devices; a failed session keeps the whole
// snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use strum::{Display, IntoEnumIterator};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

use crate::api::CwsApi;
use crate::config::BridgeConfig;
use crate::diff::{ChangeRecord, diff};
use crate::error::CoreError;
use crate::filter::NameFilter;
use crate::model::{Device, DeviceCategory, Namespace, RoomTable};
use crate::normalize::{RawBatch, normalize};
use crate::store::SnapshotStore;

const REPORT_CHANNEL_SIZE: usize = 64;

// ── Status & reports ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PollState {
    #[default]
    Idle,
    Polling,
    Failed,
}

/// Poll health observable by consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStatus {
    pub state: PollState,
    /// Some or all devices reflect an older poll.
    pub stale: bool,
    pub last_error: Option<String>,
    /// The token was rejected; retrying will not help without a new one.
    pub needs_attention: bool,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub device_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PollOutcome {
    /// Every wanted collection was fetched.
    Fresh,
    /// Some collections failed; their previous devices were kept.
    Partial,
    /// Nothing usable was fetched; the snapshot is untouched.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FetchSource {
    Session,
    Rooms,
    Devices,
    Sensors,
    Thermostats,
}

#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub source: FetchSource,
    pub error: CoreError,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Result of one completed poll, broadcast to subscribers.
#[derive(Debug, Clone)]
pub struct PollReport {
    pub outcome: PollOutcome,
    pub changes: ChangeRecord,
    pub failures: Vec<FetchFailure>,
    pub device_count: usize,
    pub finished_at: DateTime<Utc>,
}

// ── Orchestrator ─────────────────────────────────────────────────

pub struct PollOrchestrator<A> {
    api: Arc<A>,
    store: Arc<SnapshotStore>,
    filter: NameFilter,
    enabled: BTreeSet<DeviceCategory>,
    /// Collections fetched each poll.
    namespaces: BTreeSet<Namespace>,
    rooms: ArcSwap<RoomTable>,
    in_flight: Mutex<()>,
    status: watch::Sender<PollStatus>,
    reports: broadcast::Sender<Arc<PollReport>>,
}

/// Per-poll bookkeeping of collection fetches.
#[derive(Default)]
struct Tally {
    attempted: usize,
    failed: Vec<Namespace>,
    failures: Vec<FetchFailure>,
}

impl Tally {
    fn settle<T>(
        &mut self,
        result: Option<Result<Vec<T>, crestron_api::Error>>,
        source: FetchSource,
        namespace: Namespace,
        sink: &mut Vec<T>,
    ) {
        let Some(result) = result else { return };
        self.attempted += 1;
        match result {
            Ok(records) => *sink = records,
            Err(e) => {
                warn!(source = %source, error = %e, "fetch failed, keeping previous entries");
                self.failed.push(namespace);
                self.failures.push(FetchFailure {
                    source,
                    error: e.into(),
                });
            }
        }
    }

    fn is_total_failure(&self) -> bool {
        let every_fetch_failed = self.attempted > 0 && self.failed.len() == self.attempted;
        every_fetch_failed || self.failures.iter().any(|f| f.error.is_auth())
    }
}

impl<A: CwsApi> PollOrchestrator<A> {
    pub fn new(api: Arc<A>, store: Arc<SnapshotStore>, config: &BridgeConfig) -> Self {
        let (status, _) = watch::channel(PollStatus::default());
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_SIZE);
        Self {
            api,
            store,
            filter: config.name_filter(),
            enabled: config.enabled_categories.clone(),
            namespaces: Namespace::iter()
                .filter(|ns| config.wants_namespace(*ns))
                .collect(),
            rooms: ArcSwap::from_pointee(RoomTable::new()),
            in_flight: Mutex::new(()),
            status,
            reports,
        }
    }

    /// Watch poll health.
    pub fn status(&self) -> watch::Receiver<PollStatus> {
        self.status.subscribe()
    }

    pub fn current_status(&self) -> PollStatus {
        self.status.borrow().clone()
    }

    /// Receive a report after every completed poll.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PollReport>> {
        self.reports.subscribe()
    }

    /// Run one poll now.
    ///
    /// Returns `None` without doing anything if a poll is already in
    /// flight.
    pub async fn poll(&self) -> Option<Arc<PollReport>> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("poll already in flight, skipping");
            return None;
        };

        self.status.send_modify(|s| {
            s.state = PollState::Polling;
            s.last_attempt = Some(Utc::now());
        });

        let report = Arc::new(self.cycle().await);
        // No subscribers is fine.
        let _ = self.reports.send(Arc::clone(&report));
        Some(report)
    }

    async fn cycle(&self) -> PollReport {
        if let Err(e) = self.api.ensure_session().await {
            return self.fail(vec![FetchFailure {
                source: FetchSource::Session,
                error: e.into(),
            }]);
        }

        let api = &*self.api;
        let (rooms, devices, sensors, thermostats) = tokio::join!(
            api.fetch_rooms(),
            wanted(self.wants(Namespace::Device), api.fetch_devices()),
            wanted(self.wants(Namespace::Sensor), api.fetch_sensors()),
            wanted(self.wants(Namespace::Thermostat), api.fetch_thermostats()),
        );

        let mut tally = Tally::default();
        let mut batch = RawBatch::default();
        tally.settle(devices, FetchSource::Devices, Namespace::Device, &mut batch.devices);
        tally.settle(sensors, FetchSource::Sensors, Namespace::Sensor, &mut batch.sensors);
        tally.settle(
            thermostats,
            FetchSource::Thermostats,
            Namespace::Thermostat,
            &mut batch.thermostats,
        );

        let rooms = match rooms {
            Ok(raw) => {
                let table = Arc::new(RoomTable::from_rooms(raw));
                self.rooms.store(Arc::clone(&table));
                table
            }
            Err(e) => {
                warn!(error = %e, "room fetch failed, reusing previous room table");
                tally.failures.push(FetchFailure {
                    source: FetchSource::Rooms,
                    error: e.into(),
                });
                self.rooms.load_full()
            }
        };

        if tally.is_total_failure() {
            return self.fail(tally.failures);
        }

        let previous = self.store.snapshot();
        let mut devices = normalize(&batch, &rooms, &self.filter, &self.enabled, &previous);
        for namespace in &tally.failed {
            devices.extend(previous.in_namespace(*namespace).map(|d| Device::clone(d)));
        }

        let previous = self.store.replace(devices);
        let current = self.store.snapshot();
        let changes = diff(&previous, &current);
        changes.log(&previous, &current);

        let outcome = if tally.failures.is_empty() {
            PollOutcome::Fresh
        } else {
            PollOutcome::Partial
        };
        let finished_at = Utc::now();
        let device_count = current.len();

        self.status.send_modify(|s| {
            s.state = PollState::Idle;
            s.stale = outcome == PollOutcome::Partial;
            s.last_error = (!tally.failures.is_empty()).then(|| join_failures(&tally.failures));
            s.needs_attention = false;
            s.last_success = Some(finished_at);
            s.consecutive_failures = 0;
            s.device_count = device_count;
        });

        if outcome == PollOutcome::Partial {
            info!(devices = device_count, changes = changes.len(), "poll complete (partial)");
        } else {
            debug!(devices = device_count, changes = changes.len(), "poll complete");
        }

        PollReport {
            outcome,
            changes,
            failures: tally.failures,
            device_count,
            finished_at,
        }
    }

    fn fail(&self, failures: Vec<FetchFailure>) -> PollReport {
        let message = join_failures(&failures);
        let needs_attention = failures.iter().any(|f| f.error.is_auth());
        warn!(error = %message, "poll failed, keeping previous snapshot");

        self.status.send_modify(|s| {
            s.state = PollState::Failed;
            s.stale = true;
            s.last_error = Some(message);
            s.needs_attention = needs_attention;
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
        });

        PollReport {
            outcome: PollOutcome::Failed,
            changes: ChangeRecord::default(),
            failures,
            device_count: self.store.len(),
            finished_at: Utc::now(),
        }
    }

    fn wants(&self, namespace: Namespace) -> bool {
        self.namespaces.contains(&namespace)
    }
}

/// Await `fut` only if the collection is wanted.
async fn wanted<T>(wanted: bool, fut: impl Future<Output = T>) -> Option<T> {
    if wanted { Some(fut.await) } else { None }
}

fn join_failures(failures: &[FetchFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
