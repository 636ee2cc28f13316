//! Mask refinement pipeline
//!
//! Two stages, always in this order:
//!
//! 1. Morphological cleanup: close (dilate then erode) followed by open
//!    (erode then dilate) with a disk of the derived kernel size.
//! 2. Edge-aware smoothing selected by [`EdgeMode`]. A guided request falls
//!    back to bilateral smoothing when the guided filter capability is absent
//!    or the build lacks the `guided-filter` feature.

pub mod filters;

use crate::capabilities::Capabilities;
use crate::config::EdgeMode;
use crate::error::{BgRemovalError, Result};
use crate::params::DerivedParameters;
#[cfg(feature = "guided-filter")]
use filters::guided_filter;
use filters::{bilateral_filter, gaussian_blur, FloatImage, GUIDED_FILTER_COMPILED};
use image::{GrayImage, Luma, RgbImage};
use imageproc::morphology::{grayscale_close, grayscale_open, Mask};
use log::debug;
use tracing::{span, Level};

/// Refined alpha mask and the smoothing that produced it
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// Final 8-bit alpha mask
    pub mask: GrayImage,
    /// Edge mode actually applied after capability fallback
    pub applied_edge_mode: EdgeMode,
}

/// Edge mode to apply given what the runtime supports
#[must_use]
pub fn effective_edge_mode(requested: EdgeMode, capabilities: Capabilities) -> EdgeMode {
    match requested {
        EdgeMode::Guided if !(capabilities.guided_filter && GUIDED_FILTER_COMPILED) => EdgeMode::Bilateral,
        other => other,
    }
}

/// Disk structuring element spanning `kernel_size` pixels
fn structuring_element(kernel_size: u32) -> Mask {
    let radius = (kernel_size / 2).min(u32::from(u8::MAX)) as u8;
    Mask::disk(radius)
}

/// Close then open with a disk of `kernel_size`
#[must_use]
pub fn morphological_cleanup(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    let element = structuring_element(kernel_size);
    grayscale_open(&grayscale_close(mask, &element), &element)
}

fn to_float(mask: &GrayImage) -> FloatImage {
    FloatImage::from_fn(mask.width(), mask.height(), |x, y| Luma([f32::from(mask.get_pixel(x, y)[0])]))
}

fn to_gray(source: &FloatImage) -> GrayImage {
    GrayImage::from_fn(source.width(), source.height(), |x, y| {
        Luma([source.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    })
}

/// Apply one edge-aware smoothing strategy to a cleaned mask
///
/// # Errors
/// - `Processing` when the guided filter fails inside OpenCV
#[cfg_attr(not(feature = "guided-filter"), allow(unused_variables))]
pub fn smooth_edges(
    mask: &GrayImage,
    image: &RgbImage,
    edge_mode: EdgeMode,
    params: &DerivedParameters,
) -> Result<GrayImage> {
    let smoothed = match edge_mode {
        #[cfg(feature = "guided-filter")]
        EdgeMode::Guided => guided_filter(image, mask, params.guided)?,
        #[cfg(not(feature = "guided-filter"))]
        EdgeMode::Guided => bilateral_filter(mask, params.bilateral),
        EdgeMode::Bilateral => bilateral_filter(mask, params.bilateral),
        EdgeMode::Blur => to_gray(&gaussian_blur(&to_float(mask), params.blur)),
    };
    Ok(smoothed)
}

/// Run cleanup and smoothing on a raw segmentation mask
///
/// # Errors
/// - `Processing` when the mask and image dimensions differ or a filter fails
pub fn refine_mask(
    mask: &GrayImage,
    image: &RgbImage,
    requested: EdgeMode,
    params: &DerivedParameters,
    capabilities: Capabilities,
) -> Result<RefinementOutcome> {
    if mask.dimensions() != image.dimensions() {
        return Err(BgRemovalError::processing_stage_error(
            "refinement",
            &format!(
                "mask is {}x{} but image is {}x{}",
                mask.width(),
                mask.height(),
                image.width(),
                image.height()
            ),
            None,
        ));
    }

    let applied_edge_mode = effective_edge_mode(requested, capabilities);
    if applied_edge_mode != requested {
        debug!("Guided filter unavailable, falling back to {applied_edge_mode} smoothing");
    }

    let cleaned = {
        let _span = span!(Level::DEBUG, "morphology", kernel_size = params.kernel_size).entered();
        morphological_cleanup(mask, params.kernel_size)
    };

    let refined = {
        let _span = span!(Level::DEBUG, "edge_smoothing", edge_mode = %applied_edge_mode).entered();
        smooth_edges(&cleaned, image, applied_edge_mode, params)?
    };

    Ok(RefinementOutcome {
        mask: refined,
        applied_edge_mode,
    })
}
