//! Environment-driven configuration for the client core and the mock server.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_HTTP_PORT: u16 = 8090;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the remote API; request paths are absolute against it.
    pub base_url: String,
    /// Per-request timeout applied by the gateway unless a call overrides it.
    pub timeout: Duration,
    /// Directory for durable client state. Unset means in-memory only.
    pub state_dir: Option<PathBuf>,
    /// Static CSRF token for environments that provision one out of band.
    pub csrf_token: Option<String>,
    /// Listen port for the mock admin API server.
    pub http_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        let base_url = std::env::var("OPSDECK_API_BASE_URL")
            .unwrap_or_else(|_| format!("http://127.0.0.1:{DEFAULT_HTTP_PORT}"));
        let timeout_ms = std::env::var("OPSDECK_HTTP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let state_dir = std::env::var("OPSDECK_STATE_DIR").ok().map(PathBuf::from);
        let csrf_token = std::env::var("OPSDECK_CSRF_TOKEN").ok().filter(|t| !t.is_empty());
        let http_port = std::env::var("OPSDECK_HTTP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_HTTP_PORT);
        Self { base_url, timeout: Duration::from_millis(timeout_ms), state_dir, csrf_token, http_port }
    }

    pub fn log_startup(&self) {
        info!(
            target: "opsdeck",
            "config: base_url='{}', timeout_ms={}, state_dir={:?}, csrf={}, http_port={}",
            self.base_url,
            self.timeout.as_millis(),
            self.state_dir,
            if self.csrf_token.is_some() { "set" } else { "unset" },
            self.http_port
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: format!("http://127.0.0.1:{DEFAULT_HTTP_PORT}"),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            state_dir: None,
            csrf_token: None,
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}
