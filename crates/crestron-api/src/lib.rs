// crestron-api: Async Rust client for the Crestron Home CWS REST API

pub mod client;
pub mod commands;
pub mod error;
pub mod fetch;
pub mod models;
pub mod session;
pub mod transport;

pub use client::CwsClient;
pub use error::Error;
pub use models::{RawDevice, RawRoom, RawSensor, RawSetPoint, RawShade, RawThermostat};
pub use session::SESSION_TTL;
pub use transport::{TlsMode, TransportConfig};
