//! Error types for the relay.
//!
//! Every variant maps to one caller-visible HTTP status. Handlers return
//! `RelayError` directly and axum renders it as `{"detail": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid API key. Please check your {key_env}.")]
    Unauthorized { key_env: String },

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Cannot connect to {backend} at {address}. Make sure it is running and reachable.")]
    Unavailable { backend: String, address: String },

    #[error("{backend} stopped responding after {fragments} fragments.")]
    Stalled { backend: String, fragments: usize },

    #[error("{backend} closed the stream before signalling completion.")]
    Truncated { backend: String },

    #[error("{backend} error: {body}")]
    Upstream {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("Invalid request body: {message}")]
    InvalidRequest { message: String },

    #[error("Provider error: {message}")]
    Provider { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl RelayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider {
            message: msg.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn unavailable(backend: impl Into<String>, address: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.into(),
            address: address.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// HTTP status surfaced to the caller for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Stalled { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Truncated { .. } => StatusCode::BAD_GATEWAY,
            Self::InvalidRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
