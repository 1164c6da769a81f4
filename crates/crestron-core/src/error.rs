// ── Core error types ──
//
// User-facing errors from crestron-core. Consumers never see reqwest or
// serde errors directly: the `From<crestron_api::Error>` impl folds the
// transport layer into five buckets.

use thiserror::Error;

use crate::model::CompositeId;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    /// Network, DNS, timeout, TLS or payload decoding failure.
    #[error("Cannot reach processor: {message}")]
    Transport { message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The processor answered but rejected the request.
    #[error("Processor rejected request (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {id}")]
    NotFound { id: String },

    #[error("{command} is not supported by {id} ({subtype})")]
    UnsupportedCommand {
        id: CompositeId,
        command: String,
        subtype: String,
    },

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if the token was rejected and a human has to act.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<crestron_api::Error> for CoreError {
    fn from(err: crestron_api::Error) -> Self {
        if let (crestron_api::Error::Transport(e), Some(status)) = (&err, err.status()) {
            return CoreError::Remote {
                status,
                message: e.to_string(),
            };
        }
        match err {
            crestron_api::Error::Authentication { message } => {
                CoreError::Authentication { message }
            }
            crestron_api::Error::Remote { status, message } => CoreError::Remote { status, message },
            crestron_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            crestron_api::Error::Timeout { timeout_secs } => CoreError::Transport {
                message: format!("request timed out after {timeout_secs}s"),
            },
            crestron_api::Error::Tls(msg) => CoreError::Transport {
                message: format!("TLS error: {msg}"),
            },
            crestron_api::Error::Transport(e) => CoreError::Transport {
                message: e.to_string(),
            },
            crestron_api::Error::Deserialization { message, body: _ } => CoreError::Transport {
                message: format!("undecodable response: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_auth_error_maps_to_auth() {
        let err = CoreError::from(crestron_api::Error::Authentication {
            message: "bad token".into(),
        });
        assert!(err.is_auth());
    }

    #[test]
    fn timeout_maps_to_transport() {
        let err = CoreError::from(crestron_api::Error::Timeout { timeout_secs: 10 });
        assert!(matches!(err, CoreError::Transport { .. }));
        assert!(!err.is_auth());
    }

    #[test]
    fn remote_keeps_status() {
        let err = CoreError::from(crestron_api::Error::Remote {
            status: 404,
            message: "no such scene".into(),
        });
        assert!(matches!(err, CoreError::Remote { status: 404, .. }));
    }
}
