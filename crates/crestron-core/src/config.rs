// ── Runtime bridge configuration ──
//
// Describes which processor to talk to and how to sync with it. Carries
// the API token but never touches disk: `crestron-config` builds a
// `BridgeConfig` and hands it in.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crestron_api::{TlsMode, TransportConfig};
use secrecy::{ExposeSecret, SecretString};
use strum::IntoEnumIterator;

use crate::error::CoreError;
use crate::filter::NameFilter;
use crate::model::{DeviceCategory, Namespace};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Quiet period before a slider-style command is sent.
pub const COMMAND_DEBOUNCE: Duration = Duration::from_millis(200);

/// How long an optimistic update counts as fresher than polled state.
pub const OPTIMISTIC_COOLDOWN: Duration = Duration::from_secs(2);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Processors ship self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for syncing with a single processor.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Processor host or URL (e.g. `192.168.1.20`).
    pub host: String,
    /// Long-lived API token from the Crestron Home setup app.
    pub token: SecretString,
    pub poll_interval: Duration,
    pub enabled_categories: BTreeSet<DeviceCategory>,
    /// `%`-wildcard patterns of devices to hide.
    pub ignored_names: Vec<String>,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl BridgeConfig {
    /// Defaults for everything but the host and token.
    pub fn new(host: impl Into<String>, token: SecretString) -> Self {
        Self {
            host: host.into(),
            token,
            poll_interval: DEFAULT_POLL_INTERVAL,
            enabled_categories: DeviceCategory::iter().collect(),
            ignored_names: Vec::new(),
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.host.trim().is_empty() {
            return Err(config_error("host must not be empty"));
        }
        if self.token.expose_secret().trim().is_empty() {
            return Err(config_error("API token must not be empty"));
        }
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(config_error(format!(
                "poll interval {}s is below the minimum of {}s",
                self.poll_interval.as_secs(),
                MIN_POLL_INTERVAL.as_secs()
            )));
        }
        if self.timeout.is_zero() {
            return Err(config_error("request timeout must be greater than zero"));
        }
        Ok(())
    }

    pub fn name_filter(&self) -> NameFilter {
        NameFilter::new(&self.ignored_names)
    }

    pub fn is_enabled(&self, category: DeviceCategory) -> bool {
        self.enabled_categories.contains(&category)
    }

    /// Whether any enabled category is listed under `namespace`.
    pub fn wants_namespace(&self, namespace: Namespace) -> bool {
        self.enabled_categories
            .iter()
            .any(|c| c.namespace() == namespace)
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}

fn config_error(message: impl Into<String>) -> CoreError {
    CoreError::Config {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BridgeConfig {
        BridgeConfig::new("192.168.1.20", SecretString::from("token".to_string()))
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = config();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.poll_interval, Duration::from_secs(15));
        assert_eq!(cfg.enabled_categories.len(), 6);
        assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn interval_below_minimum_is_rejected() {
        let mut cfg = config();
        cfg.poll_interval = Duration::from_secs(9);
        assert!(matches!(cfg.validate(), Err(CoreError::Config { .. })));
        cfg.poll_interval = MIN_POLL_INTERVAL;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_token_is_rejected() {
        let mut cfg = config();
        cfg.token = SecretString::from(String::new());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn namespace_follows_enabled_categories() {
        let mut cfg = config();
        cfg.enabled_categories = [DeviceCategory::Light].into_iter().collect();
        assert!(cfg.wants_namespace(Namespace::Device));
        assert!(!cfg.wants_namespace(Namespace::Sensor));
        assert!(!cfg.wants_namespace(Namespace::Thermostat));
    }
}
