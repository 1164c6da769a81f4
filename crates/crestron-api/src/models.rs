// Raw CWS records
//
// Shapes of the JSON records returned by the collection endpoints. Every
// field is optional or defaulted: the processor omits fields freely and
// firmware versions disagree on a few names, so normalization decisions
// are left to `crestron-core`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /cws/api/rooms` record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoom {
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
}

/// `GET /cws/api/devices` record: lights, shades and scenes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub connection_status: Option<String>,
    #[serde(default)]
    pub scene_type: Option<String>,
}

impl RawDevice {
    /// The subtype string used for classification: `subType`, else `type`.
    pub fn kind(&self) -> &str {
        self.sub_type
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.device_type)
    }
}

/// `GET /cws/api/sensors` record.
///
/// Door sensors report `door_status` / `battery_level` in snake case; the
/// camelCase spellings seen on some firmware are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSensor {
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sub_type: String,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub connection_status: Option<String>,
    #[serde(default)]
    pub presence: Option<String>,
    #[serde(rename = "door_status", alias = "doorStatus", default)]
    pub door_status: Option<String>,
    #[serde(rename = "battery_level", alias = "batteryLevel", default)]
    pub battery_level: Option<String>,
    #[serde(default)]
    pub level: Option<i64>,
}

/// One entry of a thermostat's `currentSetPoint` / `availableSetPoints`
/// arrays, or its `setPoint` object. Temperatures are deci-degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSetPoint {
    #[serde(rename = "type", default)]
    pub setpoint_type: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
}

impl RawSetPoint {
    /// `temperature`, falling back to `value`.
    pub fn reading(&self) -> Option<f64> {
        self.temperature.or(self.value)
    }
}

/// `GET /cws/api/thermostats` record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawThermostat {
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub connection_status: Option<String>,
    #[serde(default)]
    pub current_temperature: Option<f64>,
    #[serde(default)]
    pub set_point: Option<RawSetPoint>,
    #[serde(default)]
    pub current_set_point: Vec<RawSetPoint>,
    #[serde(default)]
    pub available_set_points: Vec<RawSetPoint>,
    #[serde(default)]
    pub current_mode: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub current_fan_mode: Option<String>,
    /// A string (`"Cooling"`, `"Idle"`, ...) on most firmware, a bool on some.
    #[serde(default)]
    pub running: Option<Value>,
    #[serde(default)]
    pub available_system_modes: Vec<String>,
    #[serde(default)]
    pub available_fan_modes: Vec<String>,
    #[serde(default)]
    pub temperature_units: Option<String>,
    #[serde(default)]
    pub scheduler_state: Option<String>,
}

impl RawThermostat {
    /// `currentMode`, else `mode`, else `"Off"`.
    pub fn system_mode(&self) -> &str {
        self.current_mode
            .as_deref()
            .or(self.mode.as_deref())
            .filter(|m| !m.is_empty())
            .unwrap_or("Off")
    }
}

/// Live shade record from `GET /cws/api/shades/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShade {
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub connection_status: Option<String>,
}
