//! Configuration for the Crestron Home bridge.
//!
//! A TOML file merged with defaults and `CRESTRON_*` environment
//! variables, token resolution, and translation to
//! `crestron_core::BridgeConfig`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crestron_core::config::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use crestron_core::{BridgeConfig, CoreError, DeviceCategory, TlsVerification};

/// Variable consulted for the token when neither the file nor `token_env`
/// supplies one. Also picked up by the `CRESTRON_` environment provider.
pub const TOKEN_ENV: &str = "CRESTRON_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API token configured (set `token`, `token_env`, or {TOKEN_ENV})")]
    NoToken,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// On-disk configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Processor host or URL.
    pub host: Option<String>,

    /// API token (plaintext; prefer `token_env`).
    pub token: Option<String>,

    /// Name of an environment variable holding the API token.
    pub token_env: Option<String>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Categories to expose. Absent means all of them.
    pub enabled_categories: Option<Vec<DeviceCategory>>,

    /// `%`-wildcard patterns of devices to hide.
    #[serde(default)]
    pub ignored_names: Vec<String>,

    /// Verify the processor's certificate. Off by default: processors
    /// ship self-signed certificates.
    #[serde(default)]
    pub verify_tls: bool,

    /// Custom CA certificate; implies verification.
    pub ca_cert: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            token: None,
            token_env: None,
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            enabled_categories: None,
            ignored_names: Vec::new(),
            verify_tls: false,
            ca_cert: None,
        }
    }
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "crestron-bridge", "crestron-bridge").map_or_else(
        || PathBuf::from(".crestron-bridge.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the file at `path` (if present), then `CRESTRON_*`
/// environment variables.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CRESTRON_"))
}

/// Load from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    Ok(figment(path).extract()?)
}

/// Load from the platform config path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Resolution ──────────────────────────────────────────────────────

impl Config {
    /// Resolve the API token: the variable named by `token_env`, then
    /// `token` (from the file or `CRESTRON_TOKEN`).
    pub fn resolve_token(&self) -> Result<SecretString, ConfigError> {
        self.resolve_token_with(|name| std::env::var(name).ok())
    }

    fn resolve_token_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<SecretString, ConfigError> {
        if let Some(ref env_name) = self.token_env {
            if let Some(val) = lookup(env_name).filter(|v| !v.trim().is_empty()) {
                return Ok(SecretString::from(val));
            }
        }

        if let Some(ref token) = self.token {
            if !token.trim().is_empty() {
                return Ok(SecretString::from(token.clone()));
            }
        }

        Err(ConfigError::NoToken)
    }

    /// Validate and build the core configuration.
    pub fn to_bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::Validation {
                field: "host".into(),
                reason: "no processor host configured".into(),
            })?;
        let token = self.resolve_token()?;
        self.build(host, token)
    }

    fn build(&self, host: &str, token: SecretString) -> Result<BridgeConfig, ConfigError> {
        let mut bridge = BridgeConfig::new(host, token);
        bridge.poll_interval = Duration::from_secs(self.poll_interval_secs);
        bridge.timeout = Duration::from_secs(self.timeout_secs);
        bridge.ignored_names.clone_from(&self.ignored_names);

        if let Some(ref categories) = self.enabled_categories {
            bridge.enabled_categories = categories.iter().copied().collect::<BTreeSet<_>>();
        }

        bridge.tls = if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else if self.verify_tls {
            TlsVerification::SystemDefaults
        } else {
            TlsVerification::DangerAcceptInvalid
        };

        bridge.validate()?;
        Ok(bridge)
    }
}
