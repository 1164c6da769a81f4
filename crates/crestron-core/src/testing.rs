// Shared fixtures for unit tests.

use crate::model::{
    CompositeId, Connection, Device, DeviceState, Subtype, ThermostatState, Visibility,
};

pub(crate) fn device(id: CompositeId, subtype: Subtype, name: &str, state: DeviceState) -> Device {
    Device {
        id,
        subtype,
        raw_type: subtype.to_string(),
        raw_name: name.into(),
        room_name: String::new(),
        full_name: name.into(),
        room_id: None,
        visibility: Visibility::Visible,
        connection: if subtype == Subtype::Scene {
            Connection::NotApplicable
        } else {
            Connection::Online
        },
        state,
        optimistic_until: None,
    }
}

pub(crate) fn light(id: CompositeId, name: &str, level: u16) -> Device {
    device(
        id,
        Subtype::Dimmer,
        name,
        DeviceState::Light {
            on: level > 0,
            level,
        },
    )
}

pub(crate) fn shade(id: CompositeId, name: &str, position: u16) -> Device {
    device(id, Subtype::Shade, name, DeviceState::Shade { position })
}

pub(crate) fn thermostat(id: CompositeId, name: &str, state: ThermostatState) -> Device {
    device(id, Subtype::Thermostat, name, DeviceState::Thermostat(state))
}

pub(crate) fn switch(id: CompositeId, name: &str, on: bool) -> Device {
    let level = if on { u16::MAX } else { 0 };
    device(id, Subtype::Switch, name, DeviceState::Light { on, level })
}
