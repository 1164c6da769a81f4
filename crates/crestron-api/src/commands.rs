// CWS command endpoints
//
// Write side of the API. Values are already in wire units: light and
// shade levels are 0..=65535, temperatures are deci-degrees.

use serde_json::{Value, json};
use tracing::debug;

use crate::client::CwsClient;
use crate::error::Error;

impl CwsClient {
    /// Set a light's level with a ramp `time` in seconds.
    ///
    /// `POST /cws/api/lights/SetState` with `{"lights":[{"id","level","time"}]}`
    pub async fn set_light_state(&self, id: i64, level: u16, time: u32) -> Result<(), Error> {
        debug!(id, level, time, "setting light state");
        let body = json!({
            "lights": [{ "id": id, "level": level, "time": time }],
        });
        let _: Value = self.post("lights/SetState", Some(&body)).await?;
        Ok(())
    }

    /// Move a shade to `position`.
    ///
    /// `POST /cws/api/shades/SetState` with `{"shades":[{"id","position"}]}`
    pub async fn set_shade_position(&self, id: i64, position: u16) -> Result<(), Error> {
        debug!(id, position, "setting shade position");
        let body = json!({
            "shades": [{ "id": id, "position": position }],
        });
        let _: Value = self.post("shades/SetState", Some(&body)).await?;
        Ok(())
    }

    /// Recall a scene.
    ///
    /// `POST /cws/api/scenes/recall/{id}`
    pub async fn recall_scene(&self, id: i64) -> Result<(), Error> {
        debug!(id, "recalling scene");
        let _: Value = self.post(&format!("scenes/recall/{id}"), None).await?;
        Ok(())
    }

    /// Set one thermostat setpoint.
    ///
    /// `POST /cws/api/thermostats/SetPoint` with
    /// `{"id","setpoints":[{"type","temperature"}]}`, temperature in
    /// deci-degrees.
    pub async fn set_thermostat_setpoint(
        &self,
        id: i64,
        setpoint_type: &str,
        deci_degrees: i64,
    ) -> Result<(), Error> {
        debug!(id, setpoint_type, deci_degrees, "setting thermostat setpoint");
        let body = json!({
            "id": id,
            "setpoints": [{ "type": setpoint_type, "temperature": deci_degrees }],
        });
        let _: Value = self.post("thermostats/SetPoint", Some(&body)).await?;
        Ok(())
    }

    /// Set a thermostat's system mode (`Off`, `Heat`, `Cool`, `Auto`).
    ///
    /// `POST /cws/api/thermostats/mode` with `{"thermostats":[{"id","mode"}]}`
    pub async fn set_thermostat_mode(&self, id: i64, mode: &str) -> Result<(), Error> {
        debug!(id, mode, "setting thermostat mode");
        let body = json!({
            "thermostats": [{ "id": id, "mode": mode }],
        });
        let _: Value = self.post("thermostats/mode", Some(&body)).await?;
        Ok(())
    }

    /// Set a thermostat's fan mode.
    ///
    /// `POST /cws/api/thermostats/fanmode` with `{"thermostats":[{"id","mode"}]}`
    pub async fn set_thermostat_fan_mode(&self, id: i64, mode: &str) -> Result<(), Error> {
        debug!(id, mode, "setting thermostat fan mode");
        let body = json!({
            "thermostats": [{ "id": id, "mode": mode }],
        });
        let _: Value = self.post("thermostats/fanmode", Some(&body)).await?;
        Ok(())
    }
}
