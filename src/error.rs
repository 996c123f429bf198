//! The error module defines the single error type shared by every layer of the edge service and
//! its mapping onto HTTP responses, following the taxonomy of validation, upstream and cache-io
//! failures the request handlers and scanner branch on.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// [EdgeError] classifies every failure that can occur while serving a lookup or running a scan.
/// Variants map 1:1 onto the error taxonomy: validation is never cached, upstream responses are
/// forwarded as-is, transport/decode/cache-io failures become 500s, and rate-limiting is reported
/// distinctly so the scanner can react to it without inspecting status codes directly.
#[derive(thiserror::Error, Debug)]
pub enum EdgeError {
    /// A client-supplied identifier failed validation. Carries the human-readable body that is
    /// sent back verbatim (e.g. `"bad uuid: not-a-uuid"`).
    #[error("{0}")]
    Validation(String),

    /// The upstream responded with a status other than 200 that is not itself an error condition
    /// worth logging loudly (404, etc). Forwarded to the client unchanged, never cached.
    #[error("upstream responded with status {0}")]
    UpstreamStatus(StatusCode),

    /// The upstream responded 429. Distinguished from [EdgeError::UpstreamStatus] so callers (the
    /// scanner) can trigger throttle escalation without matching on a raw status code.
    #[error("upstream rate limited the request")]
    UpstreamRateLimited,

    /// The request to the upstream could not be completed at all (DNS, connect, timeout, TLS).
    #[error(transparent)]
    UpstreamTransport(#[from] reqwest::Error),

    /// The upstream response body could not be decoded into the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The KV store could not be reached or returned a protocol error.
    #[error(transparent)]
    CacheIo(#[from] redis::RedisError),

    /// The search index rejected or could not accept a write.
    #[error("search index error: {0}")]
    SearchIndex(String),

    /// Required configuration was missing or invalid at startup. Always fatal.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EdgeError {
    /// Builds a [EdgeError::UpstreamStatus] or [EdgeError::UpstreamRateLimited] from a reqwest
    /// status code, collapsing the upstream-status branch used throughout the adapter and handlers.
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            EdgeError::UpstreamRateLimited
        } else {
            EdgeError::UpstreamStatus(status)
        }
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        match self {
            EdgeError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            EdgeError::UpstreamStatus(status) => (status, ()).into_response(),
            EdgeError::UpstreamRateLimited => {
                (StatusCode::TOO_MANY_REQUESTS, ()).into_response()
            }
            EdgeError::UpstreamTransport(_)
            | EdgeError::Decode(_)
            | EdgeError::CacheIo(_)
            | EdgeError::SearchIndex(_)
            | EdgeError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, ()).into_response(),
        }
    }
}
