//! Authenticated API gateway
//! -------------------------
//! One uniform calling convention over the remote admin API. Every call runs
//! the request pipeline (bearer, CSRF, caller merge), performs the network
//! call, and normalizes the outcome into `ApiResult<T>`: decoded data or a
//! classified `ErrorInfo`, never a panic. A 401 response clears the session
//! and raises the navigation signal before the result reaches the caller.

mod pipeline;

pub use pipeline::{
    run_request_stages, OutboundRequest, RequestOptions, RequestStage, StageContext,
    CSRF_HEADER, REQUEST_STAGES,
};

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiResult, ErrorInfo, ErrorKind};
use crate::session::SessionStore;

/// Where the execution environment exposes a CSRF token, if anywhere.
/// Queried on every call; `None` means the request proceeds without it.
pub trait CsrfSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Fixed token provisioned out of band (config or deploy-time injection).
pub struct StaticCsrf(pub String);

impl CsrfSource for StaticCsrf {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Receives the forced-navigation signal raised after an authorization
/// failure. By the time it fires the session is already cleared.
pub trait NavigationSink: Send + Sync {
    fn redirect_to_login(&self);
}

pub struct Gateway {
    base: Url,
    http: reqwest::Client,
    session: Arc<SessionStore>,
    csrf: Option<Arc<dyn CsrfSource>>,
    nav: Option<Arc<dyn NavigationSink>>,
    timeout: Duration,
}

impl Gateway {
    pub fn new(cfg: &Config, session: Arc<SessionStore>) -> anyhow::Result<Self> {
        let base = Url::parse(&cfg.base_url).context("invalid base URL")?;
        let http = reqwest::Client::builder().build()?;
        let csrf = cfg
            .csrf_token
            .clone()
            .map(|t| Arc::new(StaticCsrf(t)) as Arc<dyn CsrfSource>);
        Ok(Self { base, http, session, csrf, nav: None, timeout: cfg.timeout })
    }

    pub fn with_csrf_source(mut self, source: Arc<dyn CsrfSource>) -> Self {
        self.csrf = Some(source);
        self
    }

    pub fn with_navigation_sink(mut self, sink: Arc<dyn NavigationSink>) -> Self {
        self.nav = Some(sink);
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::GET, path, None, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.request(Method::POST, path, Some(to_payload(body)?), None).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.request(Method::PUT, path, Some(to_payload(body)?), None).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.request(Method::PATCH, path, Some(to_payload(body)?), None).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::DELETE, path, None, None).await
    }

    /// Full calling convention. `path` is absolute against the configured
    /// base URL. Every failure path terminates in a classified `ErrorInfo`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Option<Value>,
        options: Option<RequestOptions>,
    ) -> ApiResult<T> {
        let rid = Uuid::new_v4();
        let options = options.unwrap_or_default();
        let url = self
            .base
            .join(path)
            .map_err(|e| ErrorInfo::unknown(format!("invalid request path '{path}': {e}")))?;

        let mut req = OutboundRequest {
            method,
            path: path.to_string(),
            payload,
            headers: HeaderMap::new(),
            timeout: options.timeout.unwrap_or(self.timeout),
        };
        let cx = StageContext {
            session: self.session.snapshot(),
            csrf: self.csrf.as_ref().and_then(|c| c.token()),
            caller_headers: options.headers,
        };
        run_request_stages(&cx, &mut req);
        debug!("gateway.request id={} {} {}", rid, req.method, req.path);

        let mut builder = self
            .http
            .request(req.method.clone(), url)
            .headers(req.headers.clone())
            .timeout(req.timeout);
        if let Some(body) = &req.payload {
            builder = builder.json(body);
        }
        let resp = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                error!("gateway.request id={} no response: {}", rid, e);
                let info = if e.is_builder() { ErrorInfo::unknown(&e) } else { ErrorInfo::network(&e) };
                return Err(info);
            }
        };

        let status = resp.status();
        let body = read_body(resp).await;
        if status.is_success() {
            return serde_json::from_value(body).map_err(|e| {
                error!("gateway.request id={} response decode failed: {}", rid, e);
                ErrorInfo::unknown(format!("response decode failed: {e}"))
            });
        }
        Err(self.classify_failure(rid, status, body))
    }

    // Response-stage: classification first, then the 401 side effects, and
    // only then is the result handed back. The session is cleared before the
    // caller can issue any follow-up request.
    fn classify_failure(&self, rid: Uuid, status: StatusCode, body: Value) -> ErrorInfo {
        let info = ErrorInfo::from_status(status.as_u16(), body);
        match info.kind {
            ErrorKind::Unauthorized => {
                self.session.logout();
                if let Some(nav) = &self.nav {
                    nav.redirect_to_login();
                }
                error!("gateway.request id={} unauthorized, session cleared", rid);
            }
            ErrorKind::Forbidden => {
                error!("gateway.request id={} access forbidden: {}", rid, info.payload)
            }
            ErrorKind::NotFound => {
                error!("gateway.request id={} resource not found: {}", rid, info.payload)
            }
            ErrorKind::ServerError => {
                error!("gateway.request id={} server error: {}", rid, info.payload)
            }
            _ => error!(
                "gateway.request id={} api error status={}: {}",
                rid, status, info.payload
            ),
        }
        info
    }
}

fn to_payload<B: Serialize>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| ErrorInfo::unknown(format!("payload encode failed: {e}")))
}

// Read the response body as JSON, falling back to a plain string for
// non-JSON bodies and Null for empty ones.
async fn read_body(resp: reqwest::Response) -> Value {
    let bytes = match resp.bytes().await {
        Ok(b) => b,
        Err(_) => return Value::Null,
    };
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}
