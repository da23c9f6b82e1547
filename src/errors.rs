use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::consts;

/// Standard JSON error body returned by the HTTP surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Bad Request", "Bad Gateway")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional detail, omitted unless safe to expose
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing or invalid credentials. Fails fast before any network call
    /// and is never retried automatically.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection failure or timeout reaching the gateway.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed or non-JSON gateway response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The gateway explicitly reported `status != success`. The message has
    /// already been resolved through the error-code table.
    #[error("Payment failed: {message}")]
    Business {
        code: Option<String>,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for GatewayError {
    fn from(err: validator::ValidationErrors) -> Self {
        GatewayError::Validation(err.to_string())
    }
}

impl GatewayError {
    /// Classify a reqwest failure into the transport/protocol taxonomy.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Transport(format!("gateway request timed out: {}", err))
        } else if err.is_connect() {
            GatewayError::Transport(format!("could not connect to gateway: {}", err))
        } else if err.is_decode() {
            GatewayError::Protocol(format!("invalid gateway response: {}", err))
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    /// Build a business error, resolving the code through the localized
    /// message table with the raw `errorMessage` as fallback.
    pub fn business(code: Option<String>, raw_message: Option<String>) -> Self {
        let message = code
            .as_deref()
            .and_then(|c| consts::ERROR_CODES.get(c).map(|m| (*m).to_string()))
            .or(raw_message)
            .unwrap_or_else(|| "Payment failed.".to_string());
        GatewayError::Business { code, message }
    }

    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Protocol(_) => StatusCode::BAD_GATEWAY,
            Self::Business { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message suitable for HTTP responses. Transport and protocol failures
    /// are logged with full detail server-side but surfaced generically so
    /// gateway internals never reach the end user.
    pub fn response_message(&self) -> String {
        match self {
            Self::Configuration(_) => "Payment provider is not configured.".to_string(),
            Self::Transport(_) => {
                "Could not reach the payment gateway. Please try again later.".to_string()
            }
            Self::Protocol(_) => {
                "Invalid response from the payment gateway. Please try again.".to_string()
            }
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}
