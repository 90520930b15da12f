//! Error types for the gateway request path.

use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while proxying a single request.
///
/// None of these are fatal to the process; each maps to a terminal HTTP
/// status for the affected request only.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("upstream pool not configured: {0}")]
    UnknownPool(String),

    #[error("failed to connect to upstream {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("upstream request to {addr} failed: {reason}")]
    Upstream { addr: String, reason: String },

    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid upstream request: {0}")]
    BadRequest(String),
}

impl GatewayError {
    /// HTTP status surfaced to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::UnknownPool(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Connect { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::UnknownPool(_) => "unknown_pool",
            GatewayError::Connect { .. } => "connect",
            GatewayError::Upstream { .. } => "upstream",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::BadRequest(_) => "bad_request",
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
