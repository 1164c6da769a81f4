// ── Change detection ──
//
// Each device is reduced to a short list of (field, value) pairs; two
// snapshots are compared pair-wise. Cost is O(devices x tracked fields).
// The result is advisory: it drives logs and reports, never state.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::convert::degrees_to_deci;
use crate::model::{CompositeId, Device, DeviceState};
use crate::store::Snapshot;

/// One tracked field value. Temperatures are kept in deci-degrees so
/// comparison is exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Absent,
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(v: Option<&str>) -> Self {
        v.map_or(Self::Absent, Self::from)
    }
}

fn degrees(v: Option<f64>) -> FieldValue {
    v.map_or(FieldValue::Absent, |d| FieldValue::Int(degrees_to_deci(d)))
}

pub type Fingerprint = Vec<(&'static str, FieldValue)>;

/// The tracked fields of one device.
pub fn fingerprint(device: &Device) -> Fingerprint {
    let mut fp: Fingerprint = vec![
        ("name", device.full_name.as_str().into()),
        ("visible", device.is_visible().into()),
        ("connection", device.connection.to_string().as_str().into()),
    ];

    match &device.state {
        DeviceState::Light { on, level } => {
            fp.push(("on", (*on).into()));
            fp.push(("level", (*level).into()));
        }
        DeviceState::Shade { position } => fp.push(("position", (*position).into())),
        DeviceState::Scene { active, .. } => fp.push(("active", (*active).into())),
        DeviceState::Occupancy { presence, .. } => {
            fp.push(("presence", presence.as_str().into()));
        }
        DeviceState::Door {
            door_status,
            battery_level,
            ..
        } => {
            fp.push(("door_status", door_status.as_str().into()));
            fp.push(("battery_level", battery_level.as_str().into()));
        }
        DeviceState::Photo { illuminance } => fp.push(("illuminance", (*illuminance).into())),
        DeviceState::Thermostat(t) => {
            fp.push(("current_temperature", degrees(t.current_temperature)));
            fp.push(("setpoint", degrees(t.setpoint)));
            fp.push(("mode", t.mode.as_str().into()));
            fp.push(("fan_mode", t.fan_mode.as_deref().into()));
            fp.push(("running", t.running.as_deref().into()));
        }
    }

    fp
}

/// What differs between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeRecord {
    pub added: Vec<CompositeId>,
    pub removed: Vec<CompositeId>,
    /// Id to the names of fields whose value differs.
    pub changed: BTreeMap<CompositeId, Vec<&'static str>>,
}

impl ChangeRecord {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Total number of affected devices.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }

    /// `info!` for additions and removals, `debug!` for field changes.
    pub fn log(&self, previous: &Snapshot, current: &Snapshot) {
        let name = |snap: &Snapshot, id: &CompositeId| {
            snap.get(id)
                .map_or_else(|| "unknown".to_owned(), |d| d.full_name.clone())
        };

        for id in &self.added {
            info!(%id, name = %name(current, id), "new device discovered");
        }
        for id in &self.removed {
            info!(%id, name = %name(previous, id), "device removed");
        }
        for (id, fields) in &self.changed {
            debug!(%id, name = %name(current, id), ?fields, "device changed");
        }
    }
}

/// Compare two snapshots.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> ChangeRecord {
    let mut record = ChangeRecord::default();

    for id in current.ids() {
        let Some(new) = current.get(id) else { continue };
        match previous.get(id) {
            None => record.added.push(*id),
            Some(old) => {
                let fields = changed_fields(&fingerprint(old), &fingerprint(new));
                if !fields.is_empty() {
                    record.changed.insert(*id, fields);
                }
            }
        }
    }

    record.removed = previous
        .ids()
        .filter(|id| !current.contains(id))
        .copied()
        .collect();

    record.added.sort_unstable();
    record.removed.sort_unstable();
    record
}

fn changed_fields(old: &Fingerprint, new: &Fingerprint) -> Vec<&'static str> {
    // A subtype change alters the field list itself; report every field.
    if old.len() != new.len() || old.iter().zip(new).any(|(a, b)| a.0 != b.0) {
        let mut names: Vec<_> = new.iter().map(|(name, _)| *name).collect();
        for (name, _) in old {
            if !names.contains(name) {
                names.push(name);
            }
        }
        return names;
    }

    old.iter()
        .zip(new)
        .filter(|(a, b)| a.1 != b.1)
        .map(|(a, _)| a.0)
        .collect()
}
