//! HTTP service exposing the background removal pipeline
//!
//! - `GET /health` answers `{"status": "ok"}`
//! - `POST /removebg` takes a URL-encoded form with a base64 `image_file_b64`
//!   field and an `X-Api-Key` header, and answers with the RGBA PNG
//!
//! Only available with the `server` feature. One processor is shared by all
//! requests, so a learned model is loaded once and requests are processed one
//! at a time on the blocking pool.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{Health, RemoveBgForm, API_KEY_HEADER};

use crate::config::ProcessingOptions;
use crate::error::Result;
use crate::processor::BackgroundRemovalProcessor;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Environment variable holding the API key clients must present
pub const API_KEY_ENV: &str = "BG_API_KEY";

/// Default request body limit, large enough for base64-encoded 4K photos
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Service configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: SocketAddr,
    /// Key expected in `X-Api-Key`; empty rejects every request
    pub api_key: String,
    /// Pipeline options applied to every request
    pub options: ProcessingOptions,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl ServerConfig {
    #[must_use]
    pub fn new(options: ProcessingOptions) -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            api_key: String::new(),
            options,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    #[must_use]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Read the API key from `BG_API_KEY`, leaving it empty when unset
    #[must_use]
    pub fn with_api_key_from_env(self) -> Self {
        let key = std::env::var(API_KEY_ENV).unwrap_or_default();
        self.with_api_key(key)
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("api_key_set", &!self.api_key.is_empty())
            .field("options", &self.options)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// State shared by the handlers
#[derive(Clone)]
pub(crate) struct AppState {
    api_key: Arc<str>,
    processor: Arc<Mutex<BackgroundRemovalProcessor>>,
}

/// Router with a processor built from `config.options`
///
/// # Errors
/// - `InvalidConfig` when the options fail validation
pub fn router(config: &ServerConfig) -> Result<Router> {
    let processor = BackgroundRemovalProcessor::new(config.options.clone())?;
    Ok(router_with_processor(processor, config))
}

/// Router around an already configured processor
pub fn router_with_processor(processor: BackgroundRemovalProcessor, config: &ServerConfig) -> Router {
    let state = AppState {
        api_key: Arc::from(config.api_key.as_str()),
        processor: Arc::new(Mutex::new(processor)),
    };
    Router::new()
        .route("/health", get(handlers::health))
        .route("/removebg", post(handlers::remove_background))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state)
}

/// Bind `config.bind` and serve until Ctrl-C
///
/// # Errors
/// - `InvalidConfig` when the options fail validation
/// - `Io` when the address cannot be bound or the listener fails
pub async fn serve(config: ServerConfig) -> Result<()> {
    if config.api_key.is_empty() {
        log::warn!("{API_KEY_ENV} is not set; every /removebg request will be rejected");
    }
    let app = router(&config)?;
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("🚀 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
