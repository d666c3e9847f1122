//! Error types for shopsync-api.

use reqwest::StatusCode;
use thiserror::Error;

/// All errors surfaced by the transport client and resource accessors.
///
/// A 404 is not an error; requests return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS or body-read failure.
    #[error("{method} {path}: transport error: {source}")]
    Transport {
        method: String,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// A non-retryable 4xx response.
    #[error("{method} {path} ({status}) {}", .body.as_deref().unwrap_or_default())]
    Status {
        method: String,
        path: String,
        status: StatusCode,
        body: Option<String>,
    },

    /// Rate limits, server errors or redirects persisted past the attempt budget.
    #[error("{method} {path}: gave up after {attempts} attempts (last status {status})")]
    RetriesExhausted {
        method: String,
        path: String,
        attempts: u32,
        status: StatusCode,
    },

    /// A 302 whose `Location` header names no usable host.
    #[error("{method} {path}: redirect without a usable Location ({})", .location.as_deref().unwrap_or("missing"))]
    BadRedirect {
        method: String,
        path: String,
        location: Option<String>,
    },

    /// The response decoded, but not into the expected shape.
    #[error("{context}: unexpected response shape: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON body was expected but text or bytes arrived.
    #[error("{context}: expected a JSON body")]
    UnexpectedBody { context: String },

    /// An asset attachment was not valid base64.
    #[error("invalid base64 attachment for {key}: {source}")]
    Attachment {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    /// A credential could not be encoded as a header value.
    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ApiError {
    /// HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } | ApiError::RetriesExhausted { status, .. } => {
                Some(*status)
            }
            ApiError::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}

pub(crate) fn decode_err(context: impl Into<String>, source: serde_json::Error) -> ApiError {
    ApiError::Decode {
        context: context.into(),
        source,
    }
}
