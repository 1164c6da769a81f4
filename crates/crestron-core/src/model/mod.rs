// ── Unified domain model ──
//
// Canonical representation of everything the processor reports. Lights,
// shades and scenes from `/devices`, sensors from `/sensors` and
// thermostats from `/thermostats` all become one `Device` type.

pub mod composite_id;
pub mod device;
pub mod room;

pub use composite_id::{CompositeId, Namespace};
pub use device::{
    Connection, Device, DeviceCategory, DeviceState, HiddenReason, HvacAction, Subtype,
    ThermostatState, Visibility,
};
pub use room::RoomTable;
