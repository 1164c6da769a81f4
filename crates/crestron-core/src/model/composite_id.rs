// ── Device identity ──
//
// The processor numbers devices, sensors and thermostats independently,
// so `device:12` and `sensor:12` are different things. `CompositeId`
// carries the namespace alongside the numeric id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::CoreError;

/// Which collection endpoint a record came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Namespace {
    Device,
    Sensor,
    Thermostat,
}

/// Snapshot-wide unique identifier, rendered `{namespace}:{numeric_id}`.
///
/// Ordering is by namespace, then numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeId {
    namespace: Namespace,
    id: i64,
}

impl CompositeId {
    pub const fn new(namespace: Namespace, id: i64) -> Self {
        Self { namespace, id }
    }

    pub const fn device(id: i64) -> Self {
        Self::new(Namespace::Device, id)
    }

    pub const fn sensor(id: i64) -> Self {
        Self::new(Namespace::Sensor, id)
    }

    pub const fn thermostat(id: i64) -> Self {
        Self::new(Namespace::Thermostat, id)
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// The processor-side numeric id, as used on the wire.
    pub fn raw_id(&self) -> i64 {
        self.id
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.id)
    }
}

impl FromStr for CompositeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidValue {
            message: format!("'{s}' is not a device id (expected e.g. device:12)"),
        };

        let (ns, id) = s.trim().split_once(':').ok_or_else(invalid)?;
        let namespace = ns.parse::<Namespace>().map_err(|_| invalid())?;
        let id = id.parse::<i64>().map_err(|_| invalid())?;
        Ok(Self { namespace, id })
    }
}

impl Serialize for CompositeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CompositeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
