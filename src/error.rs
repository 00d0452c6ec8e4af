//! Unified error model for gateway calls and session operations.
//! Every failure a caller can observe is one of these kinds; nothing else
//! crosses the gateway boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Failure cause, classified from the response status (or lack of one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    NetworkError,
    UnknownError,
}

/// Classified failure descriptor: the cause plus whatever body or message the
/// failing side produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    /// Server-provided body, or a plain message when no response exists.
    pub payload: Value,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, payload: Value) -> Self { Self { kind, payload } }

    pub fn message<S: Into<String>>(kind: ErrorKind, msg: S) -> Self {
        Self { kind, payload: Value::String(msg.into()) }
    }

    /// Classify a resolved-but-failed response by its status code.
    pub fn from_status(status: u16, body: Value) -> Self {
        Self { kind: classify_status(status), payload: body }
    }

    /// Connectivity failure: no response was received at all.
    pub fn network<E: Display>(err: E) -> Self {
        Self::message(ErrorKind::NetworkError, err.to_string())
    }

    pub fn unknown<E: Display>(err: E) -> Self {
        Self::message(ErrorKind::UnknownError, err.to_string())
    }

    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        Self::message(ErrorKind::Unauthorized, msg)
    }
}

/// Status-code to cause mapping. 2xx never reaches this function.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        401 => ErrorKind::Unauthorized,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::UnknownError,
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.payload)
    }
}

impl std::error::Error for ErrorInfo {}

/// The only result shape callers of the gateway or session store ever see:
/// data or a classified error, never both, never a panic.
pub type ApiResult<T> = Result<T, ErrorInfo>;
