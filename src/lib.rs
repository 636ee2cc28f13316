#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Background Remover
//!
//! Removes the background of an image and returns an RGBA image whose alpha
//! channel encodes foreground confidence.
//!
//! The pipeline resolves a quality preset, derives the seed rectangle and
//! kernel sizes from the image dimensions, segments the foreground with either
//! classical GrabCut or a learned ONNX saliency model, refines the mask with
//! morphology plus edge-aware smoothing, and composites the result.
//!
//! ## Features
//!
//! - **Two segmentation strategies**: rectangle-seeded GrabCut through OpenCV
//!   or an ONNX model (U2-Net, RMBG, etc.)
//! - **Three edge modes**: Gaussian blur, bilateral filter, guided filter
//! - **Quality presets**: `fast`, `balanced`, `quality`, with per-field overrides
//! - **Streams**: file or stdin input, file or stdout PNG output
//! - **HTTP service**: `/removebg` endpoint behind the `server` feature
//! - **Async and Sync APIs**
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bg_remover::{remove_background_from_reader, ProcessingOptions, QualityPreset};
//! use tokio::fs::File;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = ProcessingOptions::builder()
//!     .quality(QualityPreset::Quality)
//!     .use_ml(false)
//!     .build()?;
//!
//! let file = File::open("input.jpg").await?;
//! let result = remove_background_from_reader(file, &options).await?;
//! result.save_png("output.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `onnx` (default): learned segmentation through ONNX Runtime
//! - `opencv` (default): classical GrabCut segmentation; needs OpenCV installed
//! - `guided-filter` (default): guided-filter refinement from OpenCV `ximgproc`;
//!   without it guided requests fall back to bilateral smoothing
//! - `cli` (default): command-line interface and progress reporting
//! - `server`: HTTP service (`bg-remover-server` binary with `cli`)
//! - `webp-support`: WebP input decoding
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! bg-remover = { version = "0.1", default-features = false, features = ["opencv", "guided-filter"] }
//! ```

pub mod backends;
pub mod capabilities;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
#[cfg(feature = "opencv")]
mod cv;
pub mod error;
pub mod inference;
pub mod params;
pub mod processor;
pub mod refinement;
pub mod segmentation;
#[cfg(feature = "server")]
pub mod server;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use tokio::io::AsyncRead;

// Public API exports
pub use backends::*;
pub use capabilities::Capabilities;
pub use compositor::{compose_rgba, extract_alpha};
pub use config::{EdgeMode, Margin, ProcessingOptions, ProcessingOptionsBuilder, QualityPreset};
pub use error::{BgRemovalError, Result};
pub use inference::{InferenceBackend, InputSpec};
pub use params::{DerivedParameters, InsetRect};
pub use processor::{default_factory, BackendFactory, BackgroundRemovalProcessor, ClassicalOnlyFactory};
#[cfg(feature = "onnx")]
pub use processor::OnnxBackendFactory;
pub use segmentation::{
    default_segmenter, ForegroundSegmenter, Label, LabelRaster, SegmentationStrategy,
};
#[cfg(feature = "opencv")]
pub use segmentation::OpenCvSegmenter;
#[cfg(feature = "server")]
pub use server::{router, serve, ServerConfig};
pub use services::{
    ConsoleProgressReporter, ImageIOService, ImageSink, ImageSource, JsonProgressReporter,
    NoOpProgressReporter, ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{ProcessingTimings, RemovalResult};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Remove background from encoded image bytes
///
/// # Examples
///
/// ```rust,no_run
/// use bg_remover::{remove_background_from_bytes, ProcessingOptions};
///
/// # async fn example(image_data: Vec<u8>) -> anyhow::Result<()> {
/// let options = ProcessingOptions::builder()
///     .use_ml(true)
///     .model_path("u2net.onnx")
///     .build()?;
/// let result = remove_background_from_bytes(&image_data, &options).await?;
/// let png_bytes = result.to_png_bytes()?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_bytes(
    image_bytes: &[u8],
    options: &ProcessingOptions,
) -> Result<RemovalResult> {
    let mut processor = BackgroundRemovalProcessor::new(options.clone())?;
    processor.process_bytes(image_bytes)
}

/// Remove background from a `DynamicImage` directly
///
/// Images with alpha or fewer channels are converted to 8-bit RGB first.
///
/// # Examples
///
/// ```rust,no_run
/// use bg_remover::{remove_background_from_image, ProcessingOptions};
/// use image::DynamicImage;
///
/// # async fn example(img: DynamicImage) -> anyhow::Result<()> {
/// let options = ProcessingOptions::builder().use_ml(false).build()?;
/// let result = remove_background_from_image(img, &options).await?;
/// result.save_png("output.png")?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_image(
    image: image::DynamicImage,
    options: &ProcessingOptions,
) -> Result<RemovalResult> {
    let mut processor = BackgroundRemovalProcessor::new(options.clone())?;
    processor.process_image(&image)
}

/// Remove background from an async reader stream
///
/// # Examples
///
/// ```rust,no_run
/// use bg_remover::{remove_background_from_reader, ProcessingOptions};
/// use std::io::Cursor;
///
/// # async fn example(image_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let options = ProcessingOptions::builder().use_ml(false).build()?;
/// let result = remove_background_from_reader(Cursor::new(image_bytes), &options).await?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    options: &ProcessingOptions,
) -> Result<RemovalResult> {
    let buffer = ImageIOService::read_all(reader).await?;
    remove_background_from_bytes(&buffer, options).await
}
