// ── Command gateway ──
//
// Validates a command against the current snapshot, applies the expected
// result to the store optimistically, then forwards it upstream. Slider
// commands wait for a quiet period per (device, command kind); a newer
// value aborts the pending send. The last failure of a debounced send is
// kept until `flush` collects it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Notify, watch};
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

use super::{Command, CommandKind};
use crate::api::CwsApi;
use crate::config::COMMAND_DEBOUNCE;
use crate::convert::{MAX_LEVEL, clamp_level, degrees_to_deci, percent_to_level};
use crate::error::CoreError;
use crate::model::{CompositeId, Device, DeviceState, Subtype, ThermostatState};
use crate::normalize::{setpoint_type, title_case};
use crate::store::SnapshotStore;

/// A resolved upstream call, in wire units.
#[derive(Debug, PartialEq)]
enum Action {
    /// `time` is the dimmer ramp in seconds.
    Light { id: i64, level: u16, time: u32 },
    Shade { id: i64, position: u16 },
    /// Re-send the live position; `fallback` if it cannot be read.
    StopShade { id: i64, fallback: u16 },
    Scene { id: i64 },
    Setpoint { id: i64, setpoint_type: String, deci: i64 },
    Mode { id: i64, mode: String },
    FanMode { id: i64, mode: String },
}

/// An upstream call plus the state to show until the next poll.
type Plan = (Action, Option<DeviceState>);

struct PendingSend {
    ticket: u64,
    handle: AbortHandle,
}

type DebounceKey = (CompositeId, CommandKind);

/// Counts a debounced send until it completes or is aborted.
struct Outstanding(Arc<watch::Sender<usize>>);

impl Outstanding {
    fn new(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(Arc::clone(counter))
    }
}

impl Drop for Outstanding {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

pub struct CommandGateway<A> {
    api: Arc<A>,
    store: Arc<SnapshotStore>,
    pending: Arc<DashMap<DebounceKey, PendingSend>>,
    failures: Arc<DashMap<DebounceKey, CoreError>>,
    next_ticket: AtomicU64,
    outstanding: Arc<watch::Sender<usize>>,
    debounce: Duration,
    refresh: Arc<Notify>,
}

impl<A: CwsApi> CommandGateway<A> {
    /// `refresh` is notified after a scene is recalled.
    pub fn new(api: Arc<A>, store: Arc<SnapshotStore>, refresh: Arc<Notify>) -> Self {
        Self {
            api,
            store,
            pending: Arc::new(DashMap::new()),
            failures: Arc::new(DashMap::new()),
            next_ticket: AtomicU64::new(0),
            outstanding: Arc::new(watch::Sender::new(0)),
            debounce: COMMAND_DEBOUNCE,
            refresh,
        }
    }

    /// Validate, apply optimistically, and send (or schedule) a command.
    ///
    /// Unknown ids fail with [`CoreError::NotFound`], commands the subtype
    /// does not accept with [`CoreError::UnsupportedCommand`]; neither
    /// touches the network. Debounced commands return once scheduled;
    /// their upstream failures are logged and surface from
    /// [`flush`](Self::flush).
    pub async fn send_command(&self, id: &CompositeId, command: Command) -> Result<(), CoreError> {
        let device = self.store.get(id)?;
        let kind = command.kind();
        if !kind.supported_by(device.subtype) {
            return Err(CoreError::UnsupportedCommand {
                id: *id,
                command: kind.to_string(),
                subtype: device.subtype.to_string(),
            });
        }

        let (action, optimistic) = plan(&device, &command)?;
        if let Some(state) = optimistic {
            self.store.apply_optimistic(id, |d| d.state = state.clone())?;
        }

        if command.is_debounced() {
            self.schedule(*id, kind, action);
            Ok(())
        } else {
            debug!(%id, command = %kind, "sending command");
            execute(&*self.api, action, &self.refresh).await
        }
    }

    /// Abort every pending debounced send.
    pub fn cancel_pending(&self) {
        self.pending.retain(|_, p| {
            p.handle.abort();
            false
        });
    }

    /// Debounced sends that are waiting for their quiet period or still
    /// in flight.
    pub fn pending_count(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Wait for every debounced send to finish, then report the first
    /// upstream failure among them. Failures are cleared once reported.
    pub async fn flush(&self) -> Result<(), CoreError> {
        let mut rx = self.outstanding.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;

        let mut failed: Vec<(DebounceKey, CoreError)> = Vec::new();
        self.failures.retain(|key, err| {
            failed.push((*key, err.clone()));
            false
        });
        failed
            .into_iter()
            .min_by_key(|(key, _)| *key)
            .map_or(Ok(()), |(_, err)| Err(err))
    }

    fn schedule(&self, id: CompositeId, kind: CommandKind, action: Action) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let api = Arc::clone(&self.api);
        let pending = Arc::clone(&self.pending);
        let failures = Arc::clone(&self.failures);
        let refresh = Arc::clone(&self.refresh);
        let delay = self.debounce;
        let outstanding = Outstanding::new(&self.outstanding);

        let task = tokio::spawn(async move {
            let _outstanding = outstanding;
            tokio::time::sleep(delay).await;
            // Once sending, a newer value queues behind us instead of aborting.
            pending.remove_if(&(id, kind), |_, p| p.ticket == ticket);
            match execute(&*api, action, &refresh).await {
                Ok(()) => {
                    failures.remove(&(id, kind));
                }
                Err(e) => {
                    error!(%id, command = %kind, error = %e, "debounced command failed");
                    failures.insert((id, kind), e);
                    // Resync the optimistic state with the processor.
                    refresh.notify_one();
                }
            }
        });

        let entry = PendingSend {
            ticket,
            handle: task.abort_handle(),
        };
        if let Some(superseded) = self.pending.insert((id, kind), entry) {
            superseded.handle.abort();
            debug!(%id, command = %kind, "superseded pending command");
        }
    }
}

/// Resolve a command into its upstream call and optimistic state.
fn plan(device: &Device, command: &Command) -> Result<Plan, CoreError> {
    let id = device.id.raw_id();

    Ok(match (command, &device.state) {
        (Command::TurnOn { .. }, DeviceState::Light { .. }) => {
            light(id, MAX_LEVEL, ramp(device, command)?)
        }
        (Command::TurnOff { .. }, DeviceState::Light { .. }) => light(id, 0, ramp(device, command)?),
        (Command::SetBrightness { percent, .. }, DeviceState::Light { .. }) => light(
            id,
            percent_to_level(check_percent(*percent)?),
            ramp(device, command)?,
        ),

        (Command::Open, DeviceState::Shade { .. }) => shade(id, MAX_LEVEL),
        (Command::Close, DeviceState::Shade { .. }) => shade(id, 0),
        (Command::SetPosition(pct), DeviceState::Shade { .. }) => {
            shade(id, percent_to_level(check_percent(*pct)?))
        }
        (Command::Stop, DeviceState::Shade { position }) => (
            Action::StopShade {
                id,
                fallback: *position,
            },
            None,
        ),

        (Command::Activate, DeviceState::Scene { .. }) => (Action::Scene { id }, None),

        (Command::SetSetpoint(degrees), DeviceState::Thermostat(t)) => {
            check_setpoint(t, *degrees)?;
            let mut next = t.clone();
            next.setpoint = Some(*degrees);
            (
                Action::Setpoint {
                    id,
                    setpoint_type: t.setpoint_type.clone(),
                    deci: degrees_to_deci(*degrees),
                },
                Some(DeviceState::Thermostat(next)),
            )
        }
        (Command::SetHvacMode(mode), DeviceState::Thermostat(t)) => {
            let mode = resolve_option(&t.available_modes, mode, "HVAC mode")?
                .unwrap_or_else(|| title_case(mode.trim()));
            let mut next = t.clone();
            next.setpoint_type = setpoint_type(&mode);
            next.mode.clone_from(&mode);
            (Action::Mode { id, mode }, Some(DeviceState::Thermostat(next)))
        }
        (Command::SetFanMode(mode), DeviceState::Thermostat(t)) => {
            let mode = resolve_option(&t.available_fan_modes, mode, "fan mode")?
                .unwrap_or_else(|| mode.trim().to_owned());
            let mut next = t.clone();
            next.fan_mode = Some(mode.clone());
            (Action::FanMode { id, mode }, Some(DeviceState::Thermostat(next)))
        }

        // Capability checks run first; a state/subtype mismatch here means
        // the record is inconsistent.
        _ => {
            return Err(CoreError::UnsupportedCommand {
                id: device.id,
                command: command.kind().to_string(),
                subtype: device.subtype.to_string(),
            });
        }
    })
}

fn light(id: i64, level: u16, time: u32) -> Plan {
    (
        Action::Light { id, level, time },
        Some(DeviceState::Light {
            on: level > 0,
            level,
        }),
    )
}

fn shade(id: i64, position: u16) -> Plan {
    (
        Action::Shade { id, position },
        Some(DeviceState::Shade { position }),
    )
}

/// Ramp time for a light command. Only dimmers fade.
fn ramp(device: &Device, command: &Command) -> Result<u32, CoreError> {
    match command.transition() {
        None => Ok(0),
        Some(seconds) if device.subtype == Subtype::Dimmer => Ok(seconds),
        Some(_) => Err(CoreError::invalid(format!(
            "{} cannot fade; transitions apply to dimmers only",
            device.subtype
        ))),
    }
}

fn check_percent(pct: u8) -> Result<u8, CoreError> {
    if pct > 100 {
        return Err(CoreError::invalid(format!("{pct}% is out of range (0-100)")));
    }
    Ok(pct)
}

fn check_setpoint(t: &ThermostatState, degrees: f64) -> Result<(), CoreError> {
    if !degrees.is_finite() {
        return Err(CoreError::invalid("setpoint must be a finite number"));
    }
    if let (Some(min), Some(max)) = (t.min_setpoint, t.max_setpoint) {
        if degrees < min || degrees > max {
            return Err(CoreError::invalid(format!(
                "setpoint {degrees} is outside {min}..={max}"
            )));
        }
    }
    Ok(())
}

/// Case-insensitive match against the device's advertised options,
/// returning the device's own spelling. `Ok(None)` when nothing is
/// advertised.
fn resolve_option(options: &[String], wanted: &str, what: &str) -> Result<Option<String>, CoreError> {
    if options.is_empty() {
        return Ok(None);
    }
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(wanted.trim()))
        .cloned()
        .map(Some)
        .ok_or_else(|| {
            CoreError::invalid(format!(
                "{what} '{wanted}' is not one of: {}",
                options.join(", ")
            ))
        })
}

async fn execute<A: CwsApi>(api: &A, action: Action, refresh: &Notify) -> Result<(), CoreError> {
    match action {
        Action::Light { id, level, time } => api.set_light_state(id, level, time).await?,
        Action::Shade { id, position } => api.set_shade_position(id, position).await?,
        Action::StopShade { id, fallback } => {
            let position = match api.fetch_shade(id).await {
                Ok(Some(shade)) => shade.position.map_or(fallback, clamp_level),
                Ok(None) => fallback,
                Err(e) => {
                    warn!(id, error = %e, "could not read live shade position, using last known");
                    fallback
                }
            };
            api.set_shade_position(id, position).await?;
        }
        Action::Scene { id } => {
            api.recall_scene(id).await?;
            refresh.notify_one();
        }
        Action::Setpoint {
            id,
            setpoint_type,
            deci,
        } => api.set_thermostat_setpoint(id, &setpoint_type, deci).await?,
        Action::Mode { id, mode } => api.set_thermostat_mode(id, &mode).await?,
        Action::FanMode { id, mode } => api.set_thermostat_fan_mode(id, &mode).await?,
    }
    Ok(())
}
