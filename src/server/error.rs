//! HTTP error responses

use crate::error::BgRemovalError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

/// Failure of a `/removebg` request
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or mismatching `X-Api-Key`, or no key configured
    #[error("invalid or missing API key")]
    Unauthorized,

    /// Form, base64 or image decoding failed
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    /// The pipeline ran but produced no usable result
    #[error("could not identify foreground")]
    NoForeground(String),

    /// Worker or lock failure unrelated to the request contents
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidImage(_) => StatusCode::BAD_REQUEST,
            Self::NoForeground(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BgRemovalError> for ApiError {
    fn from(err: BgRemovalError) -> Self {
        match err {
            BgRemovalError::Decode(msg) => Self::InvalidImage(msg),
            BgRemovalError::Internal(msg) => Self::Internal(msg),
            other => Self::NoForeground(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("❌ {self}");
        } else {
            warn!("Rejected request ({status}): {self}");
        }

        let body = match &self {
            Self::NoForeground(detail) => json!({ "error": self.to_string(), "detail": detail }),
            _ => json!({ "detail": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
