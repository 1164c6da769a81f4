// CWS HTTP client
//
// Wraps `reqwest::Client` with CWS URL construction, session management
// and response unwrapping. Endpoint methods live in `fetch.rs` and
// `commands.rs` as inherent impls to keep this module focused on
// transport and auth mechanics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::session::{AUTH_KEY_HEADER, AUTH_TOKEN_HEADER, LoginResponse, Session};
use crate::transport::{DEFAULT_TIMEOUT, TransportConfig};

/// Path of the REST API on the processor.
const API_PATH: &str = "/cws/api/";

/// Some CWS endpoints answer HTTP 200 with `{"status":"failure", ...}`.
#[derive(Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

/// Raw HTTP client for the Crestron Home CWS API.
///
/// Owns the session: the auth key is obtained lazily on the first call,
/// renewed once it is older than [`SESSION_TTL`](crate::SESSION_TTL), and
/// renewed exactly once when a request comes back 401. Concurrent callers
/// that find the session expired serialize on a login guard, so only the
/// first one logs in and the rest reuse its key.
pub struct CwsClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
    timeout: Duration,
    session: RwLock<Option<Session>>,
    /// Serializes logins. Never held across data requests.
    login_guard: Mutex<()>,
    generation: AtomicU64,
}

impl CwsClient {
    /// Create a client for `host` (a bare hostname/IP or a full URL).
    ///
    /// Bare hosts are addressed over HTTPS. The HTTP client, and with it
    /// the connection pool, is built once here and shared by every call.
    pub fn new(host: &str, token: SecretString, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = api_base_url(host)?;
        let http = transport.build_client()?;
        Ok(Self::build(http, base_url, token, transport.timeout))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// `root` is the processor root (e.g. `https://192.168.1.20`); the
    /// `/cws/api/` prefix is appended.
    pub fn with_client(http: reqwest::Client, root: &Url, token: SecretString) -> Result<Self, Error> {
        let base_url = root.join(API_PATH)?;
        Ok(Self::build(http, base_url, token, DEFAULT_TIMEOUT))
    }

    fn build(http: reqwest::Client, base_url: Url, token: SecretString, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            token,
            timeout,
            session: RwLock::new(None),
            login_guard: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    // ── Session management ───────────────────────────────────────────

    /// Guarantee a non-expired auth key is available.
    ///
    /// Fails with [`Error::Authentication`] if the token is rejected.
    pub async fn ensure_session(&self) -> Result<(), Error> {
        self.session_or_login().await.map(|_| ())
    }

    /// Whether a non-expired auth key is currently cached.
    pub async fn has_valid_session(&self) -> bool {
        self.valid_session().await.is_some()
    }

    /// Drop the cached auth key; the next request logs in again.
    pub async fn invalidate_session(&self) {
        *self.session.write().await = None;
    }

    async fn valid_session(&self) -> Option<Session> {
        self.session
            .read()
            .await
            .as_ref()
            .filter(|s| s.is_valid())
            .cloned()
    }

    async fn session_or_login(&self) -> Result<Session, Error> {
        if let Some(session) = self.valid_session().await {
            return Ok(session);
        }

        let _guard = self.login_guard.lock().await;
        // Whoever held the guard before us may have logged in already.
        if let Some(session) = self.valid_session().await {
            trace!(generation = session.generation, "reusing session from concurrent login");
            return Ok(session);
        }
        self.login_locked().await
    }

    /// Re-login after a 401 observed with session `failed_generation`.
    async fn relogin(&self, failed_generation: u64) -> Result<Session, Error> {
        let _guard = self.login_guard.lock().await;
        if let Some(session) = self.valid_session().await {
            if session.generation != failed_generation {
                return Ok(session);
            }
        }
        self.login_locked().await
    }

    /// Exchange the API token for an auth key. Caller holds `login_guard`.
    async fn login_locked(&self) -> Result<Session, Error> {
        let url = self.endpoint("login")?;
        debug!("logging in at {}", url);

        let resp = self
            .http
            .get(url)
            .header(AUTH_TOKEN_HEADER, self.token.expose_secret())
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.invalidate_session().await;
            return Err(Error::Authentication {
                message: format!("token rejected (HTTP {status})"),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Remote {
                status: status.as_u16(),
                message: format!("login failed: {}", preview(&body)),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let login: LoginResponse = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })?;

        if login.authkey.is_empty() {
            return Err(Error::Authentication {
                message: "login response carried no auth key".into(),
            });
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let session = Session::new(SecretString::from(login.authkey), generation);
        *self.session.write().await = Some(session.clone());

        debug!(
            generation,
            version = login.version.as_deref().unwrap_or("unknown"),
            "login successful"
        );
        Ok(session)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated request and decode the JSON body.
    ///
    /// Logs in transparently when needed. A 401 triggers one re-login and
    /// one retry; a second 401 surfaces as [`Error::Authentication`].
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, Error> {
        let url = self.endpoint(path)?;
        let session = self.session_or_login().await?;

        let resp = self.send(method.clone(), url.clone(), body, &session).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return parse_response(resp).await;
        }

        debug!(%url, "session rejected (HTTP 401), re-authenticating");
        let session = self.relogin(session.generation).await?;

        let resp = self.send(method, url, body, &session).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            self.invalidate_session().await;
            return Err(Error::Authentication {
                message: "request rejected after re-login (HTTP 401)".into(),
            });
        }
        parse_response(resp).await
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::GET, path, None).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, Error> {
        self.request(Method::POST, path, body).await
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        session: &Session,
    ) -> Result<reqwest::Response, Error> {
        debug!("{method} {url}");

        let mut builder = self
            .http
            .request(method, url)
            .header(AUTH_KEY_HEADER, session.auth_key.expose_secret());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| self.send_error(e))
    }

    fn send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

/// Decode a response, mapping non-2xx and `"status":"failure"` bodies to
/// [`Error::Remote`]. An empty body decodes as JSON `null`.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Remote {
            status: status.as_u16(),
            message: format!("HTTP {status}: {}", preview(&body)),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    let text = if body.trim().is_empty() { "null" } else { body.as_str() };

    if let Ok(envelope) = serde_json::from_str::<StatusEnvelope>(text) {
        if envelope
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("failure"))
        {
            return Err(Error::Remote {
                status: status.as_u16(),
                message: envelope
                    .error_message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "request reported failure".into()),
            });
        }
    }

    serde_json::from_str(text).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })
}

/// Build the API base URL from a bare host or a full URL.
fn api_base_url(host: &str) -> Result<Url, Error> {
    let host = host.trim().trim_end_matches('/');
    let root = if host.contains("://") {
        Url::parse(host)?
    } else {
        Url::parse(&format!("https://{host}"))?
    };
    Ok(root.join(API_PATH)?)
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
