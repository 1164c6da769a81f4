// CWS collection endpoints
//
// Read side of the API: rooms, devices, sensors, thermostats and single
// shades. Records are decoded one at a time so a single malformed entry
// costs that entry only.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::CwsClient;
use crate::error::Error;
use crate::models::{RawDevice, RawRoom, RawSensor, RawShade, RawThermostat};

impl CwsClient {
    /// List all rooms.
    ///
    /// `GET /cws/api/rooms`
    pub async fn fetch_rooms(&self) -> Result<Vec<RawRoom>, Error> {
        debug!("fetching rooms");
        let body: Value = self.get("rooms").await?;
        Ok(decode_records(&body, "rooms"))
    }

    /// List lights, shades and scenes.
    ///
    /// `GET /cws/api/devices`
    pub async fn fetch_devices(&self) -> Result<Vec<RawDevice>, Error> {
        debug!("fetching devices");
        let body: Value = self.get("devices").await?;
        Ok(decode_records(&body, "devices"))
    }

    /// List occupancy, door and photo sensors.
    ///
    /// `GET /cws/api/sensors`
    pub async fn fetch_sensors(&self) -> Result<Vec<RawSensor>, Error> {
        debug!("fetching sensors");
        let body: Value = self.get("sensors").await?;
        Ok(decode_records(&body, "sensors"))
    }

    /// List thermostats.
    ///
    /// `GET /cws/api/thermostats`
    pub async fn fetch_thermostats(&self) -> Result<Vec<RawThermostat>, Error> {
        debug!("fetching thermostats");
        let body: Value = self.get("thermostats").await?;
        Ok(decode_records(&body, "thermostats"))
    }

    /// Read one shade's live state.
    ///
    /// `GET /cws/api/shades/{id}`. Returns `None` if the processor does
    /// not report a shade with that id.
    pub async fn fetch_shade(&self, id: i64) -> Result<Option<RawShade>, Error> {
        debug!(id, "fetching shade");
        let body: Value = self.get(&format!("shades/{id}")).await?;
        let shades: Vec<RawShade> = decode_records(&body, "shades");
        Ok(shades
            .into_iter()
            .find(|s| s.id.is_none_or(|sid| sid == id)))
    }
}

/// Decode the array under `key` record by record.
///
/// Accepts the `{"<key>": [...]}` envelope or a bare array. A missing key
/// yields an empty list; records that fail to decode are logged and
/// skipped.
pub(crate) fn decode_records<T: DeserializeOwned>(body: &Value, key: &str) -> Vec<T> {
    let records = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get(key) {
            Some(Value::Array(items)) => items.as_slice(),
            Some(other) => {
                warn!(key, found = %json_kind(other), "envelope member is not an array");
                return Vec::new();
            }
            None => {
                debug!(key, "envelope has no records");
                return Vec::new();
            }
        },
        Value::Null => return Vec::new(),
        other => {
            warn!(key, found = %json_kind(other), "unexpected response shape");
            return Vec::new();
        }
    };

    records
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| match T::deserialize(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    key,
                    index,
                    id = ?raw.get("id"),
                    error = %e,
                    "skipping malformed record"
                );
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_record_is_skipped() {
        let body = json!({
            "rooms": [
                {"id": 1, "name": "Kitchen"},
                {"id": "not-a-number", "name": "Broken"},
                {"id": 2, "name": "Den"}
            ]
        });
        let rooms: Vec<RawRoom> = decode_records(&body, "rooms");
        let names: Vec<_> = rooms.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Kitchen", "Den"]);
    }

    #[test]
    fn bare_array_is_accepted() {
        let body = json!([{"id": 3, "name": "Office"}]);
        let rooms: Vec<RawRoom> = decode_records(&body, "rooms");
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn missing_envelope_key_yields_nothing() {
        let body = json!({"version": "2.0"});
        let rooms: Vec<RawRoom> = decode_records(&body, "rooms");
        assert!(rooms.is_empty());
        let rooms: Vec<RawRoom> = decode_records(&Value::Null, "rooms");
        assert!(rooms.is_empty());
    }
}
