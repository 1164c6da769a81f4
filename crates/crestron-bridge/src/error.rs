//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use crestron_config::ConfigError;
use crestron_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the processor: {reason}")]
    #[diagnostic(
        code(crestron::connection_failed),
        help(
            "Check that the processor is powered and reachable from this host.\n\
             Processors use self-signed certificates; try --insecure (-k) if \
             verification is enabled in your config."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(crestron::auth_failed),
        help(
            "The API token was rejected. Generate a new one in the Crestron Home \
             setup app (Installer Settings > Web API) and update your config."
        )
    )]
    AuthFailed { message: String },

    #[error("No API token configured")]
    #[diagnostic(
        code(crestron::no_token),
        help("Set `token` or `token_env` in {path}, or export CRESTRON_TOKEN.")
    )]
    NoToken { path: String },

    // ── Devices & commands ───────────────────────────────────────────
    #[error("Device '{id}' not found")]
    #[diagnostic(
        code(crestron::not_found),
        help("Run: crestron-bridge devices --all to see available ids")
    )]
    NotFound { id: String },

    #[error("'{command}' is not supported by {id} ({subtype})")]
    #[diagnostic(code(crestron::unsupported), help("Supported commands: {supported}"))]
    Unsupported {
        id: String,
        command: String,
        subtype: String,
        supported: String,
    },

    #[error("Processor rejected the request (HTTP {status}): {message}")]
    #[diagnostic(code(crestron::rejected))]
    Rejected { status: u16, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(crestron::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(code(crestron::config), help("Config file: {path}"))]
    Config { message: String, path: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(code(crestron::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(crestron::json))]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoToken { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } | Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the config path to configuration errors.
    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        let path = path.display().to_string();
        match err {
            ConfigError::NoToken => Self::NoToken { path },
            ConfigError::Core(core) => core.into(),
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config {
                message: other.to_string(),
                path,
            },
        }
    }
}

// ── CoreError → BridgeError mapping ──────────────────────────────────

impl From<CoreError> for BridgeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { message } => Self::ConnectionFailed { reason: message },
            CoreError::Authentication { message } => Self::AuthFailed { message },
            CoreError::Remote { status, message } => Self::Rejected { status, message },
            CoreError::NotFound { id } => Self::NotFound { id },
            CoreError::UnsupportedCommand {
                id,
                command,
                subtype,
            } => {
                let supported = subtype
                    .parse()
                    .map(crestron_core::CommandKind::for_subtype)
                    .unwrap_or_default()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>();
                Self::Unsupported {
                    id: id.to_string(),
                    command,
                    subtype,
                    supported: if supported.is_empty() {
                        "none (read-only device)".into()
                    } else {
                        supported.join(", ")
                    },
                }
            }
            CoreError::InvalidValue { message } => Self::Validation {
                field: "value".into(),
                reason: message,
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}
