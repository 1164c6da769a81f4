// CWS session state
//
// The processor issues an auth key at login and expires it ten minutes
// later. The lifetime is fixed by the remote system.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use tokio::time::Instant;

/// Lifetime of an auth key issued by the processor.
pub const SESSION_TTL: Duration = Duration::from_secs(10 * 60);

/// Header carrying the long-lived API token on the login call.
pub(crate) const AUTH_TOKEN_HEADER: &str = "Crestron-RestAPI-AuthToken";

/// Header carrying the session auth key on every other call.
pub(crate) const AUTH_KEY_HEADER: &str = "Crestron-RestAPI-AuthKey";

/// Body of `GET /cws/api/login`.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub authkey: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// An issued auth key and the instant it was issued.
///
/// `generation` increments on every login so a caller that saw a 401 with
/// key N can tell whether someone already replaced it.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub auth_key: SecretString,
    pub issued_at: Instant,
    pub generation: u64,
}

impl Session {
    pub(crate) fn new(auth_key: SecretString, generation: u64) -> Self {
        Self {
            auth_key,
            issued_at: Instant::now(),
            generation,
        }
    }

    pub(crate) fn is_valid_at(&self, now: Instant) -> bool {
        now < self.issued_at + SESSION_TTL
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(SecretString::from("key".to_string()), 1)
    }

    #[tokio::test]
    async fn fresh_session_is_valid() {
        assert!(session().is_valid());
    }

    #[tokio::test]
    async fn session_expires_after_ttl() {
        let s = session();
        assert!(s.is_valid_at(s.issued_at + SESSION_TTL - Duration::from_secs(1)));
        assert!(!s.is_valid_at(s.issued_at + SESSION_TTL));
        assert!(!s.is_valid_at(s.issued_at + SESSION_TTL + Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn session_expires_with_wall_clock() {
        let s = session();
        tokio::time::advance(SESSION_TTL).await;
        assert!(!s.is_valid());
    }

    #[test]
    fn login_response_tolerates_missing_version() {
        let resp: LoginResponse = serde_json::from_str(r#"{"authkey":"abc"}"#).unwrap();
        assert_eq!(resp.authkey, "abc");
        assert!(resp.version.is_none());
    }
}
