//! Unified background removal processor
//!
//! `BackgroundRemovalProcessor` runs the whole pipeline for one image at a
//! time: option validation, parameter derivation, segmentation, refinement and
//! compositing. The CLI and the top-level convenience functions both go
//! through it so behaviour stays identical across frontends.

use crate::{
    capabilities::Capabilities,
    compositor::compose_rgba,
    config::ProcessingOptions,
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
    params::DerivedParameters,
    refinement::refine_mask,
    segmentation::{default_segmenter, ForegroundSegmenter, SegmentationDispatcher},
    services::{ImageIOService, ProcessingStage, ProcessingSummary, ProgressReporter, ProgressTracker},
    types::{ProcessingTimings, RemovalResult},
};
use image::{DynamicImage, RgbImage};
use instant::Instant;
use log::{debug, info};
use std::path::Path;
use tracing::{info as trace_info, instrument, span, Level};

/// Factory for the learned-segmentation backend
///
/// The factory decides whether learned segmentation exists at all. The
/// processor asks it once, at construction, and never branches on build
/// features itself.
pub trait BackendFactory: Send + Sync {
    /// Create an uninitialized inference backend
    ///
    /// # Errors
    /// - `InvalidConfig` when this factory cannot provide learned segmentation
    fn create_backend(&self) -> Result<Box<dyn InferenceBackend>>;

    /// Whether `create_backend` can succeed
    fn supports_learned_segmentation(&self) -> bool;
}

/// Factory for builds without learned segmentation
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicalOnlyFactory;

impl BackendFactory for ClassicalOnlyFactory {
    fn create_backend(&self) -> Result<Box<dyn InferenceBackend>> {
        Err(BgRemovalError::invalid_config(
            "Learned segmentation capability is not available: this build has no inference backend. \
             Use the classical segmentation mode instead",
        ))
    }

    fn supports_learned_segmentation(&self) -> bool {
        false
    }
}

/// Factory creating ONNX Runtime backends
#[cfg(feature = "onnx")]
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxBackendFactory;

#[cfg(feature = "onnx")]
impl BackendFactory for OnnxBackendFactory {
    fn create_backend(&self) -> Result<Box<dyn InferenceBackend>> {
        Ok(Box::new(crate::backends::OnnxBackend::new()))
    }

    fn supports_learned_segmentation(&self) -> bool {
        true
    }
}

/// Backend factory matching the capabilities compiled into this build
#[must_use]
pub fn default_factory() -> Box<dyn BackendFactory> {
    #[cfg(feature = "onnx")]
    {
        Box::new(OnnxBackendFactory)
    }
    #[cfg(not(feature = "onnx"))]
    {
        Box::new(ClassicalOnlyFactory)
    }
}

/// Background removal pipeline bound to one set of options
#[derive(Debug)]
pub struct BackgroundRemovalProcessor {
    options: ProcessingOptions,
    dispatcher: SegmentationDispatcher,
    progress_tracker: Option<ProgressTracker>,
}

impl BackgroundRemovalProcessor {
    /// Create a processor with the default backend factory
    ///
    /// # Errors
    /// - `InvalidConfig` when the options fail validation
    pub fn new(options: ProcessingOptions) -> Result<Self> {
        Self::with_factory(options, default_factory())
    }

    /// Create a processor with a custom backend factory
    ///
    /// Learned-segmentation availability is taken from the factory, guided
    /// filter availability from the build.
    ///
    /// # Errors
    /// - `InvalidConfig` when the options fail validation
    pub fn with_factory(
        options: ProcessingOptions,
        backend_factory: Box<dyn BackendFactory>,
    ) -> Result<Self> {
        let capabilities = Capabilities::probe()
            .with_learned_segmentation(backend_factory.supports_learned_segmentation());
        Self::with_capabilities(options, backend_factory, capabilities)
    }

    /// Create a processor with an explicit capability set
    ///
    /// # Errors
    /// - `InvalidConfig` when the options fail validation
    pub fn with_capabilities(
        options: ProcessingOptions,
        backend_factory: Box<dyn BackendFactory>,
        capabilities: Capabilities,
    ) -> Result<Self> {
        options.validate()?;
        debug!("Processor capabilities: {capabilities}");

        Ok(Self {
            options,
            dispatcher: SegmentationDispatcher::new(
                default_segmenter(),
                backend_factory,
                capabilities,
            ),
            progress_tracker: None,
        })
    }

    /// Replace the classical segmenter
    #[must_use]
    pub fn with_segmenter(mut self, segmenter: Box<dyn ForegroundSegmenter>) -> Self {
        self.dispatcher.set_segmenter(segmenter);
        self
    }

    /// Install an observer notified at each pipeline checkpoint
    pub fn set_progress_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        self.progress_tracker = Some(ProgressTracker::new(reporter));
    }

    /// Options this processor runs with
    #[must_use]
    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    /// Capabilities resolved at construction
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.dispatcher.capabilities()
    }

    /// Whether the learned backend has loaded its model
    #[must_use]
    pub fn is_model_loaded(&self) -> bool {
        self.dispatcher.is_backend_loaded()
    }

    /// Process an image file for background removal
    ///
    /// # Errors
    /// - `Io` when the file cannot be read
    /// - `Decode` when the file is not a supported image
    /// - Any error from [`Self::process_rgb`]
    pub async fn process_file<P: AsRef<Path>>(&mut self, input_path: P) -> Result<RemovalResult> {
        let input_path = input_path.as_ref();
        let bytes = tokio::fs::read(input_path)
            .await
            .map_err(|e| BgRemovalError::file_io_error("read input image", input_path, &e))?;
        self.process_bytes(&bytes)
    }

    /// Process encoded image bytes (PNG, JPEG, TIFF, BMP and optionally WebP)
    ///
    /// # Errors
    /// - `Decode` when the bytes are not a supported image
    /// - Any error from [`Self::process_rgb`]
    pub fn process_bytes(&mut self, image_bytes: &[u8]) -> Result<RemovalResult> {
        let decode_start = Instant::now();
        let image = ImageIOService::load_from_bytes(image_bytes)?;
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        let mut result = self.process_rgb(&image)?;
        result.timings.image_decode_ms = decode_ms;
        result.timings.total_ms += decode_ms;
        Ok(result)
    }

    /// Process image data from an async reader stream
    ///
    /// # Errors
    /// - `Io` when reading the stream fails
    /// - `Decode` when the data is empty or not a supported image
    /// - Any error from [`Self::process_rgb`]
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &mut self,
        reader: R,
    ) -> Result<RemovalResult> {
        let buffer = ImageIOService::read_all(reader).await?;
        self.process_bytes(&buffer)
    }

    /// Process a `DynamicImage`, converting it to 8-bit RGB first
    ///
    /// # Errors
    /// - Any error from [`Self::process_rgb`]
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<RemovalResult> {
        self.process_rgb(&image.to_rgb8())
    }

    /// Run the pipeline on an RGB image
    ///
    /// # Errors
    /// - `InvalidGeometry` for an empty image or a seed rectangle without interior
    /// - `InvalidConfig` when learned mode is requested but unavailable
    /// - `Inference` or `UnsupportedOutputShape` from the learned branch
    #[instrument(
        skip(self, image),
        fields(
            strategy = %crate::segmentation::SegmentationStrategy::for_options(&self.options),
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn process_rgb(&mut self, image: &RgbImage) -> Result<RemovalResult> {
        if let Some(tracker) = self.progress_tracker.as_mut() {
            tracker.restart();
        }

        let result = self.run_pipeline(image);
        if let (Err(e), Some(tracker)) = (&result, self.progress_tracker.as_ref()) {
            tracker.report_error(&e.to_string());
        }
        result
    }

    fn report_stage(&mut self, stage: ProcessingStage) {
        if let Some(tracker) = self.progress_tracker.as_mut() {
            tracker.report_stage(stage);
        }
    }

    fn run_pipeline(&mut self, image: &RgbImage) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(BgRemovalError::invalid_geometry(format!(
                "Image has no pixels ({width}x{height})"
            )));
        }
        self.options.validate()?;

        if let Some(tracker) = self.progress_tracker.as_mut() {
            tracker.report_stage_with_description(
                ProcessingStage::ImageLoaded,
                format!("Image loaded: {width}x{height}"),
            );
        }

        let params = DerivedParameters::for_image(width, height, self.options.kernel_scale);
        debug!(
            "Derived parameters: kernel {}, blur {}/{:.2}, guided r={} eps={}",
            params.kernel_size,
            params.blur.size,
            params.blur.sigma,
            params.guided.radius,
            params.guided.epsilon
        );
        if let Some(tracker) = self.progress_tracker.as_mut() {
            tracker.report_summary(ProcessingSummary::new(
                width,
                height,
                &self.options,
                params.kernel_size,
            ));
        }

        trace_info!(
            quality = %self.options.quality,
            edge_mode = %self.options.edge_mode,
            "🎯 Starting image processing"
        );

        let segmentation = {
            let _span = span!(Level::INFO, "segmentation").entered();
            let start = Instant::now();
            let outcome = self.dispatcher.segment(image, &self.options)?;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            timings.model_load_ms = outcome
                .model_load
                .map_or(0, |load| load.as_millis() as u64);
            timings.segmentation_ms = elapsed_ms.saturating_sub(timings.model_load_ms);
            outcome
        };
        if let Some(seed) = segmentation.seed {
            debug!("Classical segmentation seeded with {seed}");
        }
        self.report_stage(ProcessingStage::SegmentationComplete);

        let refined = {
            let _span = span!(Level::DEBUG, "refinement").entered();
            let start = Instant::now();
            let outcome = refine_mask(
                &segmentation.mask,
                image,
                self.options.edge_mode,
                &params,
                self.dispatcher.capabilities(),
            )?;
            timings.refinement_ms = start.elapsed().as_millis() as u64;
            outcome
        };
        self.report_stage(ProcessingStage::RefinementComplete);

        let composed = {
            let _span = span!(Level::DEBUG, "compositing").entered();
            let start = Instant::now();
            let composed = compose_rgba(image, &refined.mask)?;
            timings.compositing_ms = start.elapsed().as_millis() as u64;
            composed
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        self.report_stage(ProcessingStage::Completed);
        if let Some(tracker) = self.progress_tracker.as_ref() {
            tracker.report_completion(timings.clone());
        }

        info!(
            "📊 {} segmentation with {} edges finished in {}ms",
            segmentation.strategy, refined.applied_edge_mode, timings.total_ms
        );

        Ok(RemovalResult {
            image: composed,
            mask: refined.mask,
            parameters: params,
            strategy: segmentation.strategy,
            timings,
        })
    }
}
