// ── Upstream API seam ──
//
// The poll orchestrator and command gateway talk to the processor through
// `CwsApi` so tests can substitute an in-memory fake for `CwsClient`.

use std::future::Future;

use crestron_api::{CwsClient, Error, RawDevice, RawRoom, RawSensor, RawShade, RawThermostat};

pub trait CwsApi: Send + Sync + 'static {
    fn ensure_session(&self) -> impl Future<Output = Result<(), Error>> + Send;

    fn fetch_rooms(&self) -> impl Future<Output = Result<Vec<RawRoom>, Error>> + Send;
    fn fetch_devices(&self) -> impl Future<Output = Result<Vec<RawDevice>, Error>> + Send;
    fn fetch_sensors(&self) -> impl Future<Output = Result<Vec<RawSensor>, Error>> + Send;
    fn fetch_thermostats(&self) -> impl Future<Output = Result<Vec<RawThermostat>, Error>> + Send;
    fn fetch_shade(&self, id: i64) -> impl Future<Output = Result<Option<RawShade>, Error>> + Send;

    fn set_light_state(
        &self,
        id: i64,
        level: u16,
        time: u32,
    ) -> impl Future<Output = Result<(), Error>> + Send;
    fn set_shade_position(
        &self,
        id: i64,
        position: u16,
    ) -> impl Future<Output = Result<(), Error>> + Send;
    fn recall_scene(&self, id: i64) -> impl Future<Output = Result<(), Error>> + Send;
    fn set_thermostat_setpoint(
        &self,
        id: i64,
        setpoint_type: &str,
        deci_degrees: i64,
    ) -> impl Future<Output = Result<(), Error>> + Send;
    fn set_thermostat_mode(
        &self,
        id: i64,
        mode: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;
    fn set_thermostat_fan_mode(
        &self,
        id: i64,
        mode: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

impl CwsApi for CwsClient {
    async fn ensure_session(&self) -> Result<(), Error> {
        CwsClient::ensure_session(self).await
    }

    async fn fetch_rooms(&self) -> Result<Vec<RawRoom>, Error> {
        CwsClient::fetch_rooms(self).await
    }

    async fn fetch_devices(&self) -> Result<Vec<RawDevice>, Error> {
        CwsClient::fetch_devices(self).await
    }

    async fn fetch_sensors(&self) -> Result<Vec<RawSensor>, Error> {
        CwsClient::fetch_sensors(self).await
    }

    async fn fetch_thermostats(&self) -> Result<Vec<RawThermostat>, Error> {
        CwsClient::fetch_thermostats(self).await
    }

    async fn fetch_shade(&self, id: i64) -> Result<Option<RawShade>, Error> {
        CwsClient::fetch_shade(self, id).await
    }

    async fn set_light_state(&self, id: i64, level: u16, time: u32) -> Result<(), Error> {
        CwsClient::set_light_state(self, id, level, time).await
    }

    async fn set_shade_position(&self, id: i64, position: u16) -> Result<(), Error> {
        CwsClient::set_shade_position(self, id, position).await
    }

    async fn recall_scene(&self, id: i64) -> Result<(), Error> {
        CwsClient::recall_scene(self, id).await
    }

    async fn set_thermostat_setpoint(
        &self,
        id: i64,
        setpoint_type: &str,
        deci_degrees: i64,
    ) -> Result<(), Error> {
        CwsClient::set_thermostat_setpoint(self, id, setpoint_type, deci_degrees).await
    }

    async fn set_thermostat_mode(&self, id: i64, mode: &str) -> Result<(), Error> {
        CwsClient::set_thermostat_mode(self, id, mode).await
    }

    async fn set_thermostat_fan_mode(&self, id: i64, mode: &str) -> Result<(), Error> {
        CwsClient::set_thermostat_fan_mode(self, id, mode).await
    }
}
