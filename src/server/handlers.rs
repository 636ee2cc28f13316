//! Request handlers

use super::error::ApiError;
use super::AppState;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use tracing::{info, instrument};

/// Header carrying the client's API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Liveness payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

/// URL-encoded body of `POST /removebg`
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveBgForm {
    /// Encoded image, base64 in the standard alphabet
    #[serde_as(as = "Base64")]
    pub image_file_b64: Vec<u8>,
    /// Output size hint; the original resolution is always kept
    #[serde(default = "default_size")]
    pub size: String,
}

fn default_size() -> String {
    "auto".to_string()
}

/// `GET /health`
pub(crate) async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

/// `POST /removebg`: authenticate, decode the form and return the cut-out as PNG
#[instrument(skip_all)]
pub(crate) async fn remove_background(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<RemoveBgForm>, FormRejection>,
) -> Result<Response, ApiError> {
    authorize(&state, &headers)?;
    let Form(form) = form.map_err(|rejection| ApiError::InvalidImage(rejection.body_text()))?;
    if form.size != "auto" {
        debug!("Ignoring size hint '{}', keeping the original resolution", form.size);
    }

    let processor = state.processor.clone();
    let png = tokio::task::spawn_blocking(move || {
        let mut processor = processor
            .lock()
            .map_err(|_| ApiError::Internal("processor lock poisoned".to_string()))?;
        let result = processor.process_bytes(&form.image_file_b64)?;
        info!(
            width = result.dimensions().0,
            height = result.dimensions().1,
            total_ms = result.timings.total_ms,
            "Background removed"
        );
        result.to_png_bytes().map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// An empty configured key rejects every request
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers.get(API_KEY_HEADER).and_then(|value| value.to_str().ok());
    match presented {
        Some(key) if !state.api_key.is_empty() && key == &*state.api_key => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}
