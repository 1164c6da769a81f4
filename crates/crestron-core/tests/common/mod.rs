// In-memory stand-in for the processor.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crestron_api::{Error, RawDevice, RawRoom, RawSensor, RawSetPoint, RawShade, RawThermostat};
use crestron_core::CwsApi;

/// How a scripted call fails.
#[derive(Debug, Clone, Copy)]
pub enum FailKind {
    Timeout,
    Auth,
    Remote,
}

impl FailKind {
    fn error(self) -> Error {
        match self {
            Self::Timeout => Error::Timeout { timeout_secs: 10 },
            Self::Auth => Error::Authentication {
                message: "token rejected".into(),
            },
            Self::Remote => Error::Remote {
                status: 500,
                message: "internal error".into(),
            },
        }
    }
}

/// Upstream calls the fake observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Light { id: i64, level: u16, time: u32 },
    Shade { id: i64, position: u16 },
    Scene { id: i64 },
    Setpoint { id: i64, setpoint_type: String, deci: i64 },
    Mode { id: i64, mode: String },
    FanMode { id: i64, mode: String },
}

pub struct FakeApi {
    pub rooms: Mutex<Result<Vec<RawRoom>, FailKind>>,
    pub devices: Mutex<Result<Vec<RawDevice>, FailKind>>,
    pub sensors: Mutex<Result<Vec<RawSensor>, FailKind>>,
    pub thermostats: Mutex<Result<Vec<RawThermostat>, FailKind>>,
    pub session: Mutex<Option<FailKind>>,
    /// Every command call fails this way while set.
    pub commands: Mutex<Option<FailKind>>,
    /// While set, device fetches wait for a notification.
    pub devices_gate: Mutex<Option<Arc<Notify>>>,
    pub shades: Mutex<HashMap<i64, i64>>,
    pub calls: Mutex<Vec<Call>>,
    pub thermostat_fetches: AtomicUsize,
    pub device_fetches: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(Ok(Vec::new())),
            devices: Mutex::new(Ok(Vec::new())),
            sensors: Mutex::new(Ok(Vec::new())),
            thermostats: Mutex::new(Ok(Vec::new())),
            session: Mutex::new(None),
            commands: Mutex::new(None),
            devices_gate: Mutex::new(None),
            shades: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            thermostat_fetches: AtomicUsize::new(0),
            device_fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_rooms(&self, rooms: Result<Vec<RawRoom>, FailKind>) {
        *self.rooms.lock().unwrap() = rooms;
    }

    pub fn set_devices(&self, devices: Result<Vec<RawDevice>, FailKind>) {
        *self.devices.lock().unwrap() = devices;
    }

    pub fn set_sensors(&self, sensors: Result<Vec<RawSensor>, FailKind>) {
        *self.sensors.lock().unwrap() = sensors;
    }

    pub fn set_thermostats(&self, thermostats: Result<Vec<RawThermostat>, FailKind>) {
        *self.thermostats.lock().unwrap() = thermostats;
    }

    pub fn fail_session(&self, kind: Option<FailKind>) {
        *self.session.lock().unwrap() = kind;
    }

    pub fn fail_commands(&self, kind: Option<FailKind>) {
        *self.commands.lock().unwrap() = kind;
    }

    /// Hold device fetches until the returned gate is notified.
    pub fn hold_devices(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.devices_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn set_shade_position(&self, id: i64, position: i64) {
        self.shades.lock().unwrap().insert(id, position);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Record a command call, or fail it if commands are scripted to fail.
    fn record(&self, call: Call) -> Result<(), Error> {
        let failure = *self.commands.lock().unwrap();
        if let Some(kind) = failure {
            return Err(kind.error());
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

fn scripted<T: Clone>(slot: &Mutex<Result<Vec<T>, FailKind>>) -> Result<Vec<T>, Error> {
    slot.lock().unwrap().clone().map_err(FailKind::error)
}

impl CwsApi for FakeApi {
    async fn ensure_session(&self) -> Result<(), Error> {
        let failure = *self.session.lock().unwrap();
        failure.map_or(Ok(()), |kind| Err(kind.error()))
    }

    async fn fetch_rooms(&self) -> Result<Vec<RawRoom>, Error> {
        scripted(&self.rooms)
    }

    async fn fetch_devices(&self) -> Result<Vec<RawDevice>, Error> {
        self.device_fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.devices_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        scripted(&self.devices)
    }

    async fn fetch_sensors(&self) -> Result<Vec<RawSensor>, Error> {
        scripted(&self.sensors)
    }

    async fn fetch_thermostats(&self) -> Result<Vec<RawThermostat>, Error> {
        self.thermostat_fetches.fetch_add(1, Ordering::SeqCst);
        scripted(&self.thermostats)
    }

    async fn fetch_shade(&self, id: i64) -> Result<Option<RawShade>, Error> {
        let position = self.shades.lock().unwrap().get(&id).copied();
        Ok(position.map(|p| RawShade {
            id: Some(id),
            position: Some(p),
            ..RawShade::default()
        }))
    }

    async fn set_light_state(&self, id: i64, level: u16, time: u32) -> Result<(), Error> {
        self.record(Call::Light { id, level, time })
    }

    async fn set_shade_position(&self, id: i64, position: u16) -> Result<(), Error> {
        self.record(Call::Shade { id, position })
    }

    async fn recall_scene(&self, id: i64) -> Result<(), Error> {
        self.record(Call::Scene { id })
    }

    async fn set_thermostat_setpoint(
        &self,
        id: i64,
        setpoint_type: &str,
        deci_degrees: i64,
    ) -> Result<(), Error> {
        self.record(Call::Setpoint {
            id,
            setpoint_type: setpoint_type.into(),
            deci: deci_degrees,
        })
    }

    async fn set_thermostat_mode(&self, id: i64, mode: &str) -> Result<(), Error> {
        self.record(Call::Mode {
            id,
            mode: mode.into(),
        })
    }

    async fn set_thermostat_fan_mode(&self, id: i64, mode: &str) -> Result<(), Error> {
        self.record(Call::FanMode {
            id,
            mode: mode.into(),
        })
    }
}

// ── Record builders ─────────────────────────────────────────────────

pub fn room(id: i64, name: &str) -> RawRoom {
    RawRoom {
        id: Some(id),
        name: name.into(),
    }
}

pub fn dimmer(id: i64, name: &str, room_id: i64, level: i64) -> RawDevice {
    RawDevice {
        id: Some(id),
        name: name.into(),
        device_type: "Light".into(),
        sub_type: Some("Dimmer".into()),
        room_id: Some(room_id),
        level: Some(level),
        ..RawDevice::default()
    }
}

pub fn shade(id: i64, name: &str, room_id: i64, position: i64) -> RawDevice {
    RawDevice {
        id: Some(id),
        name: name.into(),
        device_type: "Shade".into(),
        room_id: Some(room_id),
        position: Some(position),
        ..RawDevice::default()
    }
}

pub fn scene(id: i64, name: &str, room_id: i64) -> RawDevice {
    RawDevice {
        id: Some(id),
        name: name.into(),
        device_type: "Scene".into(),
        room_id: Some(room_id),
        status: Some(false),
        ..RawDevice::default()
    }
}

pub fn door(id: i64, name: &str, room_id: i64, status: &str) -> RawSensor {
    RawSensor {
        id: Some(id),
        name: name.into(),
        sub_type: "DoorSensor".into(),
        room_id: Some(room_id),
        door_status: Some(status.into()),
        ..RawSensor::default()
    }
}

pub fn heat_pump(id: i64, name: &str, room_id: i64) -> RawThermostat {
    RawThermostat {
        id: Some(id),
        name: Some(name.into()),
        room_id: Some(room_id),
        current_temperature: Some(205.0),
        current_mode: Some("Heat".into()),
        current_set_point: vec![RawSetPoint {
            setpoint_type: Some("Heat".into()),
            temperature: Some(210.0),
            ..RawSetPoint::default()
        }],
        available_set_points: vec![RawSetPoint {
            setpoint_type: Some("Heat".into()),
            min_value: Some(100.0),
            max_value: Some(300.0),
            ..RawSetPoint::default()
        }],
        available_system_modes: vec!["Off".into(), "Heat".into(), "Cool".into(), "Auto".into()],
        available_fan_modes: vec!["Auto".into(), "On".into()],
        temperature_units: Some("DeciCelsius".into()),
        ..RawThermostat::default()
    }
}
