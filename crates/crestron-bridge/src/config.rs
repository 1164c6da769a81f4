//! CLI-aware configuration: the config file plus global flag overrides.

use std::path::PathBuf;
use std::time::Duration;

use crestron_config::{Config, config_path, load_config_from};
use crestron_core::BridgeConfig;

use crate::cli::GlobalOpts;
use crate::error::BridgeError;

/// The config file path in effect.
pub fn effective_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config file and apply `--host` / `--insecure`.
pub fn load(global: &GlobalOpts) -> Result<Config, BridgeError> {
    let path = effective_path(global);
    let mut cfg = load_config_from(&path).map_err(|e| BridgeError::from_config(e, &path))?;

    if let Some(ref host) = global.host {
        cfg.host = Some(host.clone());
    }
    if global.insecure {
        cfg.verify_tls = false;
        cfg.ca_cert = None;
    }
    Ok(cfg)
}

/// Build a validated `BridgeConfig`, optionally overriding the poll
/// interval.
pub fn bridge_config(
    global: &GlobalOpts,
    interval: Option<Duration>,
) -> Result<BridgeConfig, BridgeError> {
    let path = effective_path(global);
    let cfg = load(global)?;
    let mut bridge = cfg
        .to_bridge_config()
        .map_err(|e| BridgeError::from_config(e, &path))?;

    if let Some(interval) = interval {
        bridge.poll_interval = interval;
        bridge.validate()?;
    }
    Ok(bridge)
}
