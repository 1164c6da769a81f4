// crestron-core: Device synchronization layer between crestron-api and consumers.

pub mod api;
pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod diff;
pub mod error;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod poll;
pub mod store;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use api::CwsApi;
pub use command::{Command, CommandGateway, CommandKind};
pub use config::{BridgeConfig, TlsVerification};
pub use controller::Controller;
pub use diff::{ChangeRecord, FieldValue};
pub use error::CoreError;
pub use filter::NameFilter;
pub use poll::{FetchFailure, FetchSource, PollOrchestrator, PollOutcome, PollReport, PollState, PollStatus};
pub use store::{Snapshot, SnapshotStore};

pub use model::{
    CompositeId, Connection, Device, DeviceCategory, DeviceState, HiddenReason, HvacAction,
    Namespace, RoomTable, Subtype, ThermostatState, Visibility,
};
