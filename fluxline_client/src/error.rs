use thiserror::Error;

use fluxline_common::date_time::DateTimeError;
use fluxline_common::precision::PrecisionError;
use fluxline_line::error::EncodeError;

/// Message used when every host is disabled and a request fails fast.
pub const NO_HOST_AVAILABLE: &str = "No host available";

/// Client failures, distinguishable at the top level.
#[derive(Error, Debug)]
pub enum ClientError {
    /// An HTTP 3xx/4xx response. Never retried; the host is not penalized.
    #[error("{status} {message}: {body}")]
    Request {
        status: u16,
        message: String,
        body: String,
    },
    /// An HTTP 5xx response, a resubmittable transport failure, a
    /// per-attempt timeout, or an exhausted host set.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// A non-empty `error` string in a result entry, after successful
    /// transport.
    #[error("{0}")]
    Results(String),
    /// A schema or encoding violation, raised before any transport occurs.
    #[error(transparent)]
    Validation(#[from] EncodeError),
    /// An unknown precision tag or out-of-range timestamp.
    #[error(transparent)]
    Precision(#[from] PrecisionError),
    /// A malformed time value in a response.
    #[error(transparent)]
    DateTime(#[from] DateTimeError),
    /// A response body that is not the expected JSON shape.
    #[error("failed to decode response: {0}")]
    Json(#[from] serde_json::Error),
    /// A host URL that cannot be parsed or uses an unsupported scheme.
    #[error("invalid host URL `{0}`")]
    InvalidUrl(String),
    /// A write or measurement listing issued without a database, either on
    /// the call or at client construction.
    #[error("no database specified")]
    DatabaseRequired,
    /// A transport failure outside the resubmit set, surfaced verbatim.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Whether this failure penalized a host and is eligible for retry.
    pub const fn is_service_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }

    /// Whether this is a 3xx/4xx response error.
    pub const fn is_request_error(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}
