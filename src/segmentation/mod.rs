//! Segmentation dispatch
//!
//! Chooses between classical rectangle-seeded segmentation and a learned
//! saliency model, checks each branch's preconditions, and normalizes both
//! outputs into a single-channel mask with the image's dimensions.

#[cfg(feature = "opencv")]
pub mod grabcut;
pub mod labels;

#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "opencv")]
pub use grabcut::OpenCvSegmenter;
pub use labels::{ForegroundSegmenter, Label, LabelRaster};

use crate::capabilities::Capabilities;
use crate::config::ProcessingOptions;
use crate::error::{BgRemovalError, Result};
use crate::inference::{InferenceBackend, InputSpec};
use crate::params::{inset_rect, InsetRect};
use crate::processor::BackendFactory;
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use instant::Duration;
use log::{debug, info};
use ndarray::{Array2, Array4, ArrayD, Axis, Ix2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{span, Level};

/// Segmentation strategy used for an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationStrategy {
    /// Rectangle-seeded colour-model segmentation
    Classical,
    /// Per-pixel saliency from an ONNX model
    Learned,
}

impl SegmentationStrategy {
    /// Strategy the options ask for
    #[must_use]
    pub fn for_options(options: &ProcessingOptions) -> Self {
        if options.use_ml {
            Self::Learned
        } else {
            Self::Classical
        }
    }
}

impl std::fmt::Display for SegmentationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classical => write!(f, "classical"),
            Self::Learned => write!(f, "learned"),
        }
    }
}

/// Mask produced by either branch
#[derive(Debug, Clone)]
pub struct SegmentationOutcome {
    /// Raw mask with the image's dimensions
    pub mask: GrayImage,
    /// Branch that produced the mask
    pub strategy: SegmentationStrategy,
    /// Seed rectangle, classical branch only
    pub seed: Option<InsetRect>,
    /// Model loading time when the learned backend was loaded by this call
    pub model_load: Option<Duration>,
}

/// Classical segmenter compiled into this build, if any
#[must_use]
pub fn default_segmenter() -> Option<Box<dyn ForegroundSegmenter>> {
    #[cfg(feature = "opencv")]
    {
        Some(Box::new(OpenCvSegmenter::new()))
    }
    #[cfg(not(feature = "opencv"))]
    {
        None
    }
}

/// Routes images to the classical segmenter or the learned backend
pub struct SegmentationDispatcher {
    segmenter: Option<Box<dyn ForegroundSegmenter>>,
    backend_factory: Box<dyn BackendFactory>,
    backend: Option<Box<dyn InferenceBackend>>,
    capabilities: Capabilities,
}

impl std::fmt::Debug for SegmentationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationDispatcher")
            .field("capabilities", &self.capabilities)
            .field("classical", &self.segmenter.is_some())
            .field("backend_loaded", &self.backend.is_some())
            .finish_non_exhaustive()
    }
}

impl SegmentationDispatcher {
    /// Dispatcher with an optional classical segmenter
    ///
    /// Without a segmenter the classical branch reports `InvalidConfig`.
    #[must_use]
    pub fn new(
        segmenter: Option<Box<dyn ForegroundSegmenter>>,
        backend_factory: Box<dyn BackendFactory>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            segmenter,
            backend_factory,
            backend: None,
            capabilities,
        }
    }

    /// Capabilities the dispatcher was configured with
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether a learned backend has been created
    #[must_use]
    pub fn is_backend_loaded(&self) -> bool {
        self.backend.as_ref().is_some_and(|b| b.is_initialized())
    }

    /// Whether the classical branch has a segmenter
    #[must_use]
    pub fn has_segmenter(&self) -> bool {
        self.segmenter.is_some()
    }

    /// Replace the classical segmenter
    pub fn set_segmenter(&mut self, segmenter: Box<dyn ForegroundSegmenter>) {
        self.segmenter = Some(segmenter);
    }

    /// Segment `image` with the branch selected by `options`
    ///
    /// # Errors
    /// - `InvalidConfig` when learned mode lacks a model path or the capability,
    ///   or when classical mode has no segmenter
    /// - `InvalidGeometry` when the classical seed rectangle has no interior
    /// - `Inference` or `UnsupportedOutputShape` from the learned branch
    pub fn segment(
        &mut self,
        image: &RgbImage,
        options: &ProcessingOptions,
    ) -> Result<SegmentationOutcome> {
        match SegmentationStrategy::for_options(options) {
            SegmentationStrategy::Classical => {
                let (mask, seed) = segment_classical(
                    self.segmenter.as_deref(),
                    image,
                    options.margin,
                    options.iterations,
                )?;
                Ok(SegmentationOutcome {
                    mask,
                    strategy: SegmentationStrategy::Classical,
                    seed: Some(seed),
                    model_load: None,
                })
            },
            SegmentationStrategy::Learned => {
                let model_path = require_model_path(options)?;
                if !self.capabilities.learned_segmentation {
                    return Err(BgRemovalError::invalid_config(format!(
                        "Learned segmentation is not available in this build ({}). \
                         Use the classical segmentation mode instead",
                        self.capabilities
                    )));
                }

                if self.backend.is_none() {
                    self.backend = Some(self.backend_factory.create_backend()?);
                }
                let backend = self
                    .backend
                    .as_mut()
                    .ok_or_else(|| BgRemovalError::internal("Learned backend not created"))?;
                let model_load = backend.initialize(Path::new(model_path), options.intra_threads)?;
                let mask = segment_learned(&mut **backend, image)?;

                Ok(SegmentationOutcome {
                    mask,
                    strategy: SegmentationStrategy::Learned,
                    seed: None,
                    model_load,
                })
            },
        }
    }
}

/// Model path for learned mode, rejecting missing or blank paths
///
/// # Errors
/// - `InvalidConfig` when no usable path is set
pub fn require_model_path(options: &ProcessingOptions) -> Result<&str> {
    options.model_path().ok_or_else(|| {
        BgRemovalError::invalid_config(
            "Learned segmentation requires a model path. \
             Use the classical segmentation mode (--grabcut) instead",
        )
    })
}

/// Classical branch: derive the seed rectangle, segment and collapse labels
///
/// # Errors
/// - `InvalidGeometry` when the inset leaves no interior
/// - `InvalidConfig` when `segmenter` is `None`
pub fn segment_classical(
    segmenter: Option<&dyn ForegroundSegmenter>,
    image: &RgbImage,
    margin: crate::config::Margin,
    iterations: u32,
) -> Result<(GrayImage, InsetRect)> {
    let (width, height) = image.dimensions();
    let seed = inset_rect(width, height, margin)?;
    debug!("Seed rectangle: {seed} (margin {margin})");
    let segmenter = segmenter.ok_or_else(|| {
        BgRemovalError::invalid_config(
            "Classical segmentation is not available in this build (built without the `opencv` feature). \
             Use learned segmentation with --model instead",
        )
    })?;

    let _span = span!(Level::DEBUG, "classical_segmentation", iterations = iterations).entered();
    info!("Processing image with GrabCut algorithm...");
    let labels = segmenter.segment(image, seed, iterations)?;
    Ok((collapse_labels(&labels), seed))
}

/// Learned branch: one inference call on the resized image
///
/// # Errors
/// - Backend errors from `input_spec` or `infer`
/// - `UnsupportedOutputShape` for output tensors of rank other than 2, 3 or 4
pub fn segment_learned(backend: &mut dyn InferenceBackend, image: &RgbImage) -> Result<GrayImage> {
    let spec = backend.input_spec()?;
    let input = prepare_input(image, &spec);

    let _span = span!(Level::DEBUG, "learned_segmentation", input = %spec.name).entered();
    info!("Running ML inference...");
    let output = backend.infer(&input)?;
    let raster = extract_raster(&output)?;
    info!("ML inference completed");

    let (width, height) = image.dimensions();
    raster_to_mask(&raster, width, height)
}

/// Foreground and probable foreground become 255, everything else 0
#[must_use]
pub fn collapse_labels(labels: &LabelRaster) -> GrayImage {
    let data = labels
        .labels()
        .iter()
        .map(|label| if label.is_foreground() { 255 } else { 0 })
        .collect();
    GrayImage::from_raw(labels.width(), labels.height(), data)
        .unwrap_or_else(|| GrayImage::new(labels.width(), labels.height()))
}

/// Resize and normalize the image into a channel-major tensor matching `spec`
///
/// Values are in [0, 1] and channels follow RGB order. Models declaring a
/// single channel receive the red plane; batch entries are identical copies.
#[must_use]
pub fn prepare_input(image: &RgbImage, spec: &InputSpec) -> Array4<f32> {
    let (batch, channels, height, width) = spec.resolved_shape();
    let resized = imageops::resize(image, width as u32, height as u32, FilterType::Triangle);
    Array4::from_shape_fn((batch, channels, height, width), |(_, c, y, x)| {
        f32::from(resized.get_pixel(x as u32, y as u32)[c.min(2)]) / 255.0
    })
}

/// Extract the 2-D saliency raster from an output tensor
///
/// Rank 4 is read as (batch, channel, H, W), rank 3 as (batch, H, W) and rank
/// 2 as (H, W); the first batch entry and channel are used.
///
/// # Errors
/// - `UnsupportedOutputShape` for any other rank or an empty axis
pub fn extract_raster(output: &ArrayD<f32>) -> Result<Array2<f32>> {
    let shape = output.shape();
    if !(2..=4).contains(&shape.len()) || shape.contains(&0) {
        return Err(BgRemovalError::unsupported_output_shape(shape));
    }

    let mut view = output.view();
    while view.ndim() > 2 {
        view = view.index_axis_move(Axis(0), 0);
    }
    view.into_dimensionality::<Ix2>()
        .map(|raster| raster.to_owned())
        .map_err(|_| BgRemovalError::unsupported_output_shape(shape))
}

/// Resize a float raster to the image size and rescale [0, 1] to [0, 255]
///
/// # Errors
/// - `Processing` when the raster is empty
pub fn raster_to_mask(raster: &Array2<f32>, width: u32, height: u32) -> Result<GrayImage> {
    let (rows, cols) = raster.dim();
    let source: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(cols as u32, rows as u32, raster.iter().copied().collect())
            .filter(|_| rows > 0 && cols > 0)
            .ok_or_else(|| {
                BgRemovalError::processing(format!(
                    "Cannot build a mask from a {rows}x{cols} raster"
                ))
            })?;

    let resized = if (cols as u32, rows as u32) == (width, height) {
        source
    } else {
        imageops::resize(&source, width, height, FilterType::Triangle)
    };

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let value = resized.get_pixel(x, y)[0];
        Luma([(value.clamp(0.0, 1.0) * 255.0).round() as u8])
    }))
}
