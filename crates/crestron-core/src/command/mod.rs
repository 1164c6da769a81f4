// ── Command API ──
//
// Imperative requests against a single device. Each command carries its
// value; `CommandKind` is the value-less discriminant used for capability
// checks and debounce keys.

mod gateway;

pub use gateway::CommandGateway;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::CoreError;
use crate::model::Subtype;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Full level. `transition` is a dimmer ramp in seconds.
    TurnOn { transition: Option<u32> },
    TurnOff { transition: Option<u32> },
    /// Light brightness in percent (0..=100).
    SetBrightness { percent: u8, transition: Option<u32> },
    /// Shade position in percent open (0..=100).
    SetPosition(u8),
    Open,
    Close,
    /// Halt a moving shade where it is.
    Stop,
    /// Recall a scene.
    Activate,
    /// Target temperature in degrees.
    SetSetpoint(f64),
    SetHvacMode(String),
    SetFanMode(String),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CommandKind {
    TurnOn,
    TurnOff,
    SetBrightness,
    SetPosition,
    Open,
    Close,
    Stop,
    Activate,
    SetSetpoint,
    SetHvacMode,
    SetFanMode,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::TurnOn { .. } => CommandKind::TurnOn,
            Self::TurnOff { .. } => CommandKind::TurnOff,
            Self::SetBrightness { .. } => CommandKind::SetBrightness,
            Self::SetPosition(_) => CommandKind::SetPosition,
            Self::Open => CommandKind::Open,
            Self::Close => CommandKind::Close,
            Self::Stop => CommandKind::Stop,
            Self::Activate => CommandKind::Activate,
            Self::SetSetpoint(_) => CommandKind::SetSetpoint,
            Self::SetHvacMode(_) => CommandKind::SetHvacMode,
            Self::SetFanMode(_) => CommandKind::SetFanMode,
        }
    }

    /// Slider-style commands are coalesced; discrete ones are sent at once.
    pub fn is_debounced(&self) -> bool {
        matches!(self, Self::SetBrightness { .. } | Self::SetPosition(_))
    }

    /// Ramp time in seconds, for light commands that carry one.
    pub fn transition(&self) -> Option<u32> {
        match self {
            Self::TurnOn { transition }
            | Self::TurnOff { transition }
            | Self::SetBrightness { transition, .. } => *transition,
            _ => None,
        }
    }

    /// Attach a ramp time to a light command.
    pub fn with_transition(self, seconds: u32) -> Result<Self, CoreError> {
        let transition = Some(seconds);
        Ok(match self {
            Self::TurnOn { .. } => Self::TurnOn { transition },
            Self::TurnOff { .. } => Self::TurnOff { transition },
            Self::SetBrightness { percent, .. } => Self::SetBrightness { percent, transition },
            other => {
                return Err(CoreError::invalid(format!(
                    "{} does not take a transition",
                    other.kind()
                )));
            }
        })
    }

    /// Build a command from a name (`set_position`, `set-position`) and an
    /// optional textual value. `turn_on` and `turn_off` read the value as
    /// a transition in seconds; `set_brightness` accepts `PCT@SECS`.
    pub fn parse(name: &str, value: Option<&str>) -> Result<Self, CoreError> {
        let kind: CommandKind = name
            .trim()
            .replace('-', "_")
            .parse()
            .map_err(|_| CoreError::invalid(format!("unknown command '{name}'")))?;

        let required = || {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CoreError::invalid(format!("{kind} requires a value")))
        };
        let percent = |v: &str| {
            v.trim_end_matches('%')
                .parse::<u8>()
                .ok()
                .filter(|p| *p <= 100)
                .ok_or_else(|| CoreError::invalid(format!("'{v}' is not a percentage (0-100)")))
        };

        let seconds = |v: &str| {
            v.trim_end_matches('s')
                .parse::<u32>()
                .map_err(|_| CoreError::invalid(format!("'{v}' is not a transition in seconds")))
        };
        let transition = || {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(seconds)
                .transpose()
        };

        Ok(match kind {
            CommandKind::TurnOn => Self::TurnOn {
                transition: transition()?,
            },
            CommandKind::TurnOff => Self::TurnOff {
                transition: transition()?,
            },
            CommandKind::Open => Self::Open,
            CommandKind::Close => Self::Close,
            CommandKind::Stop => Self::Stop,
            CommandKind::Activate => Self::Activate,
            CommandKind::SetBrightness => {
                let v = required()?;
                let (pct, ramp) = match v.split_once('@') {
                    Some((pct, ramp)) => (pct.trim(), Some(seconds(ramp.trim())?)),
                    None => (v, None),
                };
                Self::SetBrightness {
                    percent: percent(pct)?,
                    transition: ramp,
                }
            }
            CommandKind::SetPosition => Self::SetPosition(percent(required()?)?),
            CommandKind::SetSetpoint => {
                let v = required()?;
                let degrees = v
                    .parse::<f64>()
                    .map_err(|_| CoreError::invalid(format!("'{v}' is not a temperature")))?;
                Self::SetSetpoint(degrees)
            }
            CommandKind::SetHvacMode => Self::SetHvacMode(required()?.to_owned()),
            CommandKind::SetFanMode => Self::SetFanMode(required()?.to_owned()),
        })
    }
}

impl CommandKind {
    /// Whether a device of `subtype` accepts this command.
    pub fn supported_by(self, subtype: Subtype) -> bool {
        match subtype {
            Subtype::Dimmer => matches!(self, Self::TurnOn | Self::TurnOff | Self::SetBrightness),
            Subtype::Switch => matches!(self, Self::TurnOn | Self::TurnOff),
            Subtype::Shade => matches!(
                self,
                Self::Open | Self::Close | Self::Stop | Self::SetPosition
            ),
            Subtype::Scene => matches!(self, Self::Activate),
            Subtype::Thermostat => matches!(
                self,
                Self::SetSetpoint | Self::SetHvacMode | Self::SetFanMode
            ),
            Subtype::OccupancySensor | Subtype::DoorSensor | Subtype::PhotoSensor => false,
        }
    }

    /// Every command a device of `subtype` accepts.
    pub fn for_subtype(subtype: Subtype) -> Vec<Self> {
        Self::iter().filter(|k| k.supported_by(subtype)).collect()
    }
}
