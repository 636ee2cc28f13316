//! Result types for background removal operations

use crate::error::{BgRemovalError, Result};
use crate::params::DerivedParameters;
use crate::segmentation::SegmentationStrategy;
use image::{GrayImage, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Wall-clock time spent in each pipeline stage, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Decoding the input (0 when an already decoded image was passed in)
    pub image_decode_ms: u64,
    /// Loading the model, only on the first learned-mode call
    pub model_load_ms: u64,
    /// Classical segmentation or preprocessing plus inference
    pub segmentation_ms: u64,
    /// Morphological cleanup and edge smoothing
    pub refinement_ms: u64,
    /// Building the RGBA result
    pub compositing_ms: u64,
    /// End-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Sum of the individual stage timings
    #[must_use]
    pub fn stages_total_ms(&self) -> u64 {
        self.image_decode_ms
            + self.model_load_ms
            + self.segmentation_ms
            + self.refinement_ms
            + self.compositing_ms
    }
}

/// Result of a background removal operation
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// Original colour channels with the refined mask as alpha
    pub image: RgbaImage,
    /// Refined alpha mask
    pub mask: GrayImage,
    /// Parameters derived for this image
    pub parameters: DerivedParameters,
    /// Segmentation branch that produced the mask
    pub strategy: SegmentationStrategy,
    /// Stage timings
    pub timings: ProcessingTimings,
}

impl RemovalResult {
    /// Image dimensions as (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Encode the RGBA result as PNG
    ///
    /// # Errors
    /// - `Encode` when the PNG encoder fails
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }

    /// Encode the RGBA result as PNG and write it to `path`, creating missing
    /// parent directories
    ///
    /// # Errors
    /// - `Encode` when the PNG encoder fails
    /// - `Io` when the file cannot be written
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::services::ImageIOService::save_png(&self.image, path)
    }
}

/// Encode an RGBA image as PNG at maximum compression
///
/// # Errors
/// - `Encode` when the PNG encoder fails
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};

    let mut bytes = Vec::new();
    PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| BgRemovalError::encode(format!("Failed to encode PNG: {e}")))?;
    Ok(bytes)
}
