//! Request-stage pipeline: an explicit ordered list of transformation steps
//! applied to every outbound request before it reaches the network. Ordering
//! lives in one slice rather than in registration order, so it is a testable
//! property of the module.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use tracing::warn;

use crate::session::SessionSnapshot;

pub const CSRF_HEADER: &str = "x-csrf-token";

/// Ephemeral outbound request descriptor, constructed per call and dropped
/// once the response resolves.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub path: String,
    pub payload: Option<Value>,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

/// Caller-supplied per-call options, merged by the last pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
}

/// Everything a stage may read: the session as of this call, the CSRF token
/// the environment yielded (if any), and the caller's headers.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub session: SessionSnapshot,
    pub csrf: Option<String>,
    pub caller_headers: HeaderMap,
}

pub type RequestStage = fn(&StageContext, &mut OutboundRequest);

/// The request pipeline. Order is the contract: bearer credential first,
/// CSRF second, caller merge last — and the merge never overrides the
/// authorization header.
pub const REQUEST_STAGES: &[RequestStage] = &[attach_bearer, attach_csrf, merge_caller_headers];

pub fn run_request_stages(cx: &StageContext, req: &mut OutboundRequest) {
    for stage in REQUEST_STAGES {
        stage(cx, req);
    }
}

fn attach_bearer(cx: &StageContext, req: &mut OutboundRequest) {
    if let Some(token) = &cx.session.token {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(v) => {
                req.headers.insert(AUTHORIZATION, v);
            }
            Err(_) => warn!("session token is not header-safe, sending without credentials"),
        }
    }
}

fn attach_csrf(cx: &StageContext, req: &mut OutboundRequest) {
    // absence is not an error; the request proceeds without the header
    if let Some(token) = &cx.csrf {
        if let Ok(v) = HeaderValue::from_str(token) {
            req.headers.insert(CSRF_HEADER, v);
        }
    }
}

fn merge_caller_headers(cx: &StageContext, req: &mut OutboundRequest) {
    for (name, value) in cx.caller_headers.iter() {
        if name == &AUTHORIZATION {
            continue;
        }
        req.headers.insert(name.clone(), value.clone());
    }
}
