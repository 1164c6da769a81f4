// ── Normalizer ──
//
// Maps raw collection records into canonical `Device`s: composite ids,
// room names, display names, visibility and per-subtype state. Pure
// apart from logging.

use std::collections::BTreeSet;

use crestron_api::{RawDevice, RawSensor, RawSetPoint, RawThermostat};
use tracing::{debug, info};

use crate::convert::{clamp_level, deci_to_degrees};
use crate::filter::NameFilter;
use crate::model::{
    CompositeId, Connection, Device, DeviceCategory, DeviceState, HiddenReason, RoomTable,
    Subtype, ThermostatState, Visibility,
};
use crate::store::Snapshot;

const PRESENCE_VACANT: &str = "Vacant";
const PRESENCE_UNAVAILABLE: &str = "Unavailable";
const DOOR_OPEN: &str = "Open";

/// Raw records from one poll. A namespace that was not fetched, or whose
/// fetch failed, is simply empty here.
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub devices: Vec<RawDevice>,
    pub sensors: Vec<RawSensor>,
    pub thermostats: Vec<RawThermostat>,
}

/// Display name: the raw name prefixed by its room, unless it already
/// starts with the room name (case-insensitive).
pub fn full_name(raw_name: &str, room_name: &str) -> String {
    let name = raw_name.trim();
    let room = room_name.trim();
    if room.is_empty() || name.to_lowercase().starts_with(&room.to_lowercase()) {
        return name.to_owned();
    }
    format!("{room} {name}").trim().to_owned()
}

/// Normalize a batch into devices.
///
/// `previous` is consulted only to log visibility flips.
pub fn normalize(
    batch: &RawBatch,
    rooms: &RoomTable,
    filter: &NameFilter,
    enabled: &BTreeSet<DeviceCategory>,
    previous: &Snapshot,
) -> Vec<Device> {
    let mut out =
        Vec::with_capacity(batch.devices.len() + batch.sensors.len() + batch.thermostats.len());

    out.extend(batch.devices.iter().filter_map(|raw| device_from_raw(raw, rooms)));
    out.extend(batch.sensors.iter().filter_map(|raw| sensor_from_raw(raw, rooms)));
    out.extend(
        batch
            .thermostats
            .iter()
            .filter_map(|raw| thermostat_from_raw(raw, rooms)),
    );

    for device in &mut out {
        device.visibility = visibility(device, filter, enabled);

        if let Some(prev) = previous.get(&device.id) {
            if prev.visibility != device.visibility {
                match device.visibility {
                    Visibility::Visible => info!(id = %device.id, name = %device.full_name, "device now visible"),
                    Visibility::Hidden(reason) => info!(
                        id = %device.id,
                        name = %device.full_name,
                        reason = reason.describe(),
                        "device now hidden"
                    ),
                }
            }
        }
    }

    out
}

fn visibility(
    device: &Device,
    filter: &NameFilter,
    enabled: &BTreeSet<DeviceCategory>,
) -> Visibility {
    if filter.matches(&device.full_name, &device.raw_type) {
        Visibility::Hidden(HiddenReason::NameFilter)
    } else if !enabled.contains(&device.category()) {
        Visibility::Hidden(HiddenReason::CategoryDisabled)
    } else {
        Visibility::Visible
    }
}

fn room_name(rooms: &RoomTable, room_id: Option<i64>, inline: Option<&str>) -> String {
    room_id
        .and_then(|id| rooms.name(id))
        .or(inline)
        .unwrap_or_default()
        .to_owned()
}

/// Naming and placement shared by every record kind.
struct Placement<'a> {
    raw_type: &'a str,
    raw_name: &'a str,
    room_name: String,
    room_id: Option<i64>,
}

fn assemble(
    id: CompositeId,
    subtype: Subtype,
    placement: Placement<'_>,
    connection: Connection,
    state: DeviceState,
) -> Device {
    Device {
        id,
        subtype,
        raw_type: placement.raw_type.to_owned(),
        raw_name: placement.raw_name.to_owned(),
        full_name: full_name(placement.raw_name, &placement.room_name),
        room_name: placement.room_name,
        room_id: placement.room_id,
        visibility: Visibility::Visible,
        connection,
        state,
        optimistic_until: None,
    }
}

// ── /devices ────────────────────────────────────────────────────────

fn device_from_raw(raw: &RawDevice, rooms: &RoomTable) -> Option<Device> {
    let id = raw.id?;
    let kind = raw.kind();
    let Some(subtype) = Subtype::from_raw(kind) else {
        debug!(id, kind, "skipping device with unknown subtype");
        return None;
    };

    let level = clamp_level(raw.level.unwrap_or(0));
    let (state, connection) = match subtype {
        Subtype::Dimmer | Subtype::Switch => {
            let on = if raw.level.is_some() {
                level > 0
            } else {
                raw.status.unwrap_or(false)
            };
            (DeviceState::Light { on, level }, raw_connection(raw))
        }
        Subtype::Shade => (
            DeviceState::Shade {
                position: clamp_level(raw.position.unwrap_or(0)),
            },
            raw_connection(raw),
        ),
        Subtype::Scene => (
            DeviceState::Scene {
                active: raw.status.unwrap_or(false),
                scene_type: raw.scene_type.clone(),
            },
            Connection::NotApplicable,
        ),
        other => {
            debug!(id, kind = %other, "sensor/thermostat subtype listed under /devices, skipping");
            return None;
        }
    };

    let placement = Placement {
        raw_type: kind,
        raw_name: &raw.name,
        room_name: room_name(rooms, raw.room_id, raw.room_name.as_deref()),
        room_id: raw.room_id,
    };
    Some(assemble(CompositeId::device(id), subtype, placement, connection, state))
}

fn raw_connection(raw: &RawDevice) -> Connection {
    Connection::from_raw(raw.connection_status.as_deref())
}

// ── /sensors ────────────────────────────────────────────────────────

fn sensor_from_raw(raw: &RawSensor, rooms: &RoomTable) -> Option<Device> {
    let id = raw.id?;
    let subtype = Subtype::from_raw(&raw.sub_type)
        .filter(|s| matches!(s, Subtype::OccupancySensor | Subtype::DoorSensor | Subtype::PhotoSensor));
    let Some(subtype) = subtype else {
        debug!(id, kind = %raw.sub_type, "skipping sensor with unknown subtype");
        return None;
    };

    let state = match subtype {
        Subtype::OccupancySensor => {
            let presence = raw
                .presence
                .clone()
                .unwrap_or_else(|| PRESENCE_UNAVAILABLE.into());
            DeviceState::Occupancy {
                occupied: presence != PRESENCE_VACANT && presence != PRESENCE_UNAVAILABLE,
                presence,
            }
        }
        Subtype::DoorSensor => {
            let door_status = raw.door_status.clone().unwrap_or_else(|| "Closed".into());
            DeviceState::Door {
                open: door_status == DOOR_OPEN,
                door_status,
                battery_level: raw
                    .battery_level
                    .clone()
                    .unwrap_or_else(|| "Normal".into()),
            }
        }
        _ => DeviceState::Photo {
            illuminance: raw.level.unwrap_or(0),
        },
    };

    let placement = Placement {
        raw_type: &raw.sub_type,
        raw_name: &raw.name,
        room_name: room_name(rooms, raw.room_id, None),
        room_id: raw.room_id,
    };
    let connection = Connection::from_raw(raw.connection_status.as_deref());
    Some(assemble(CompositeId::sensor(id), subtype, placement, connection, state))
}

// ── /thermostats ────────────────────────────────────────────────────

fn thermostat_from_raw(raw: &RawThermostat, rooms: &RoomTable) -> Option<Device> {
    let id = raw.id?;
    let mode = raw.system_mode().to_owned();
    let (min_setpoint, max_setpoint) = setpoint_bounds(raw);

    let state = ThermostatState {
        current_temperature: raw.current_temperature.map(deci_to_degrees),
        setpoint: target_setpoint(raw).map(deci_to_degrees),
        setpoint_type: setpoint_type(&mode),
        fan_mode: raw.current_fan_mode.clone(),
        running: raw.running.as_ref().and_then(running_label),
        units: raw
            .temperature_units
            .clone()
            .unwrap_or_else(|| "DeciCelsius".into()),
        min_setpoint: min_setpoint.map(deci_to_degrees),
        max_setpoint: max_setpoint.map(deci_to_degrees),
        available_modes: raw.available_system_modes.clone(),
        available_fan_modes: raw.available_fan_modes.clone(),
        scheduler_state: raw.scheduler_state.clone(),
        mode,
    };

    debug!(
        id,
        mode = %state.mode,
        temperature = ?state.current_temperature,
        "processed thermostat"
    );

    let placement = Placement {
        raw_type: "Thermostat",
        raw_name: raw.name.as_deref().unwrap_or("Thermostat"),
        room_name: room_name(rooms, raw.room_id, None),
        room_id: raw.room_id,
    };
    Some(assemble(
        CompositeId::thermostat(id),
        Subtype::Thermostat,
        placement,
        Connection::from_raw(raw.connection_status.as_deref()),
        DeviceState::Thermostat(state),
    ))
}

/// Target temperature in deci-degrees.
///
/// Prefers the `currentSetPoint` entry matching the current mode, then a
/// cool or heat entry, then any entry with a value. Falls back to the
/// `setPoint` object.
fn target_setpoint(raw: &RawThermostat) -> Option<f64> {
    let entries = &raw.current_set_point;
    if entries.is_empty() {
        return raw.set_point.as_ref().and_then(|sp| sp.temperature);
    }

    let of_type = |wanted: &str| {
        entries
            .iter()
            .find(|sp| type_is(sp, wanted))
            .and_then(RawSetPoint::reading)
    };

    of_type(raw.system_mode())
        .or_else(|| of_type("cool"))
        .or_else(|| of_type("heat"))
        .or_else(|| entries.iter().find_map(RawSetPoint::reading))
}

fn type_is(sp: &RawSetPoint, wanted: &str) -> bool {
    sp.setpoint_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case(wanted))
}

/// Min/max from `availableSetPoints` (across all entries), else `setPoint`.
fn setpoint_bounds(raw: &RawThermostat) -> (Option<f64>, Option<f64>) {
    let min = raw
        .available_set_points
        .iter()
        .filter_map(|sp| sp.min_value)
        .reduce(f64::min);
    let max = raw
        .available_set_points
        .iter()
        .filter_map(|sp| sp.max_value)
        .reduce(f64::max);
    if let (Some(min), Some(max)) = (min, max) {
        return (Some(min), Some(max));
    }

    match &raw.set_point {
        Some(RawSetPoint {
            min_value: Some(min),
            max_value: Some(max),
            ..
        }) => (Some(*min), Some(*max)),
        _ => (None, None),
    }
}

/// Setpoint type for a mode: title-cased, with `Off` mapping to `Cool`.
pub fn setpoint_type(mode: &str) -> String {
    if mode.eq_ignore_ascii_case("off") || mode.is_empty() {
        return "Cool".into();
    }
    title_case(mode)
}

pub(crate) fn title_case(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn running_label(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(true) => Some("Running".into()),
        serde_json::Value::Bool(false) => Some("Idle".into()),
        _ => None,
    }
}
