// ── Device domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tokio::time::Instant;

use super::composite_id::{CompositeId, Namespace};

/// Device subtype as reported by the processor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString, EnumIter, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Subtype {
    Dimmer,
    Switch,
    Shade,
    Scene,
    OccupancySensor,
    DoorSensor,
    PhotoSensor,
    Thermostat,
}

impl Subtype {
    /// Parse a processor `subType`/`type` string. Unknown strings yield `None`.
    pub fn from_raw(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    pub fn category(self) -> DeviceCategory {
        match self {
            Self::Dimmer | Self::Switch => DeviceCategory::Light,
            Self::Shade => DeviceCategory::Shade,
            Self::Scene => DeviceCategory::Scene,
            Self::OccupancySensor | Self::DoorSensor => DeviceCategory::BinarySensor,
            Self::PhotoSensor => DeviceCategory::Sensor,
            Self::Thermostat => DeviceCategory::Thermostat,
        }
    }

    /// The collection endpoint this subtype is listed under.
    pub fn namespace(self) -> Namespace {
        match self {
            Self::Dimmer | Self::Switch | Self::Shade | Self::Scene => Namespace::Device,
            Self::OccupancySensor | Self::DoorSensor | Self::PhotoSensor => Namespace::Sensor,
            Self::Thermostat => Namespace::Thermostat,
        }
    }
}

/// Presentation category, used for the enabled-category filter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceCategory {
    Light,
    Shade,
    Scene,
    BinarySensor,
    Sensor,
    Thermostat,
}

impl DeviceCategory {
    /// The collection endpoint that lists devices of this category.
    pub fn namespace(self) -> Namespace {
        match self {
            Self::Light | Self::Shade | Self::Scene => Namespace::Device,
            Self::BinarySensor | Self::Sensor => Namespace::Sensor,
            Self::Thermostat => Namespace::Thermostat,
        }
    }
}

/// Why a device is hidden from consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenReason {
    NameFilter,
    CategoryDisabled,
}

impl HiddenReason {
    pub fn describe(self) -> &'static str {
        match self {
            Self::NameFilter => "Device hidden by name filter",
            Self::CategoryDisabled => "Device hidden by category filter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum Visibility {
    Visible,
    Hidden(HiddenReason),
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }
}

/// Physical link state reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Connection {
    Online,
    Offline,
    /// Scenes have no physical connection.
    NotApplicable,
}

impl Connection {
    /// `connectionStatus` is `"online"`/`"offline"`; anything else, or a
    /// missing field, counts as online.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.trim().eq_ignore_ascii_case("offline") => Self::Offline,
            _ => Self::Online,
        }
    }
}

/// What a thermostat is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HvacAction {
    Off,
    Heating,
    Cooling,
    Idle,
}

/// Thermostat readings, temperatures in real degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermostatState {
    pub current_temperature: Option<f64>,
    pub setpoint: Option<f64>,
    /// Setpoint type sent with `SetPoint` commands (`Heat`, `Cool`, `Auto`).
    pub setpoint_type: String,
    pub mode: String,
    pub fan_mode: Option<String>,
    pub running: Option<String>,
    /// Processor unit string, e.g. `DeciCelsius` or `DeciFahrenheit`.
    pub units: String,
    pub min_setpoint: Option<f64>,
    pub max_setpoint: Option<f64>,
    pub available_modes: Vec<String>,
    pub available_fan_modes: Vec<String>,
    pub scheduler_state: Option<String>,
}

impl ThermostatState {
    /// Half a degree either side of the setpoint counts as satisfied.
    const DEADBAND: f64 = 0.5;

    pub fn is_celsius(&self) -> bool {
        self.units.contains("Celsius")
    }

    /// Derive the current action from the reported `running` state, or
    /// from the mode and temperatures when `running` is absent.
    pub fn action(&self) -> HvacAction {
        let mode = self.mode.to_ascii_lowercase();
        if mode == "off" {
            return HvacAction::Off;
        }

        if let Some(running) = self.running.as_deref() {
            match running.to_ascii_lowercase().as_str() {
                "cooling" => return HvacAction::Cooling,
                "heating" => return HvacAction::Heating,
                "idle" | "off" => return HvacAction::Idle,
                _ => {}
            }
        }

        let (Some(current), Some(target)) = (self.current_temperature, self.setpoint) else {
            return HvacAction::Idle;
        };

        let too_hot = current > target + Self::DEADBAND;
        let too_cold = current < target - Self::DEADBAND;
        match mode.as_str() {
            "cool" if too_hot => HvacAction::Cooling,
            "heat" if too_cold => HvacAction::Heating,
            "auto" if too_hot => HvacAction::Cooling,
            "auto" if too_cold => HvacAction::Heating,
            _ => HvacAction::Idle,
        }
    }
}

/// Per-subtype state. Levels and positions are raw `0..=65535`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceState {
    Light {
        on: bool,
        level: u16,
    },
    Shade {
        position: u16,
    },
    Scene {
        active: bool,
        scene_type: Option<String>,
    },
    Occupancy {
        occupied: bool,
        presence: String,
    },
    Door {
        open: bool,
        door_status: String,
        battery_level: String,
    },
    Photo {
        illuminance: i64,
    },
    Thermostat(ThermostatState),
}

/// The canonical device record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: CompositeId,
    pub subtype: Subtype,
    /// The processor's own type string, also matched by the name filter.
    pub raw_type: String,
    pub raw_name: String,
    pub room_name: String,
    /// Room-prefixed display name; never repeats the room.
    pub full_name: String,
    pub room_id: Option<i64>,
    pub visibility: Visibility,
    pub connection: Connection,
    pub state: DeviceState,
    /// Set by the command gateway; a fresh poll clears it.
    #[serde(skip)]
    pub optimistic_until: Option<Instant>,
}

impl Device {
    pub fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }

    /// False only when the processor reports the device offline.
    pub fn is_available(&self) -> bool {
        self.connection != Connection::Offline
    }

    pub fn category(&self) -> DeviceCategory {
        self.subtype.category()
    }

    /// Whether an optimistic update is still inside its cooldown window.
    pub fn is_cooling_down(&self) -> bool {
        self.optimistic_until
            .is_some_and(|until| Instant::now() < until)
    }

    pub fn thermostat(&self) -> Option<&ThermostatState> {
        match &self.state {
            DeviceState::Thermostat(t) => Some(t),
            _ => None,
        }
    }

    /// Short human-readable state, used by the CLI and change logs.
    pub fn state_summary(&self) -> String {
        match &self.state {
            DeviceState::Light { on, level } => {
                if *on {
                    format!("on ({}%)", crate::convert::level_to_percent(*level))
                } else {
                    "off".into()
                }
            }
            DeviceState::Shade { position } => {
                format!("{}% open", crate::convert::level_to_percent(*position))
            }
            DeviceState::Scene { active, .. } => {
                String::from(if *active { "active" } else { "inactive" })
            }
            DeviceState::Occupancy { presence, .. } => presence.clone(),
            DeviceState::Door { door_status, .. } => door_status.clone(),
            DeviceState::Photo { illuminance } => format!("{illuminance} lx"),
            DeviceState::Thermostat(t) => {
                let fmt = |v: Option<f64>| v.map_or_else(|| "?".into(), |v| format!("{v:.1}"));
                format!(
                    "{} {} -> {} ({})",
                    t.mode,
                    fmt(t.current_temperature),
                    fmt(t.setpoint),
                    t.action()
                )
            }
        }
    }
}
