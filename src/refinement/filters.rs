//! Edge-smoothing primitives
//!
//! Blur and bilateral smoothing come from `imageproc`; the guided filter is
//! OpenCV's `ximgproc` implementation and needs the `guided-filter` feature.
//! Every filter returns a raster with the dimensions of its input.

use crate::params::{BilateralParameters, BlurParameters};
use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::separable_filter_equal;

#[cfg(feature = "guided-filter")]
use crate::{error::Result, params::GuidedParameters};
#[cfg(feature = "guided-filter")]
use image::RgbImage;

/// Whether this build carries the guided filter implementation
pub const GUIDED_FILTER_COMPILED: bool = cfg!(feature = "guided-filter");

/// Single-channel float raster
pub type FloatImage = Image<Luma<f32>>;

/// Normalized 1-D Gaussian kernel of `size` taps
#[must_use]
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let size = size.max(1) as usize;
    let center = (size as f32 - 1.0) / 2.0;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let offset = i as f32 - center;
            if two_sigma_sq > 0.0 {
                (-(offset * offset) / two_sigma_sq).exp()
            } else if offset == 0.0 {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    if sum > 0.0 {
        for weight in &mut kernel {
            *weight /= sum;
        }
    }
    kernel
}

/// Gaussian blur with an explicit kernel size and sigma
#[must_use]
pub fn gaussian_blur(source: &FloatImage, params: BlurParameters) -> FloatImage {
    let kernel = gaussian_kernel(params.size, params.sigma);
    separable_filter_equal(source, &kernel)
}

/// Bilateral smoothing of an 8-bit mask
#[must_use]
pub fn bilateral_filter(mask: &GrayImage, params: BilateralParameters) -> GrayImage {
    if mask.width() == 0 || mask.height() == 0 {
        return mask.clone();
    }
    imageproc::filter::bilateral_filter(mask, params.diameter, params.sigma_color, params.sigma_space)
}

/// Guided filter of `mask` steered by the luminance of `image`
///
/// The mask is filtered on the [0, 1] scale and scaled back with saturation.
///
/// # Errors
/// - `Processing` when OpenCV rejects the inputs
#[cfg(feature = "guided-filter")]
pub fn guided_filter(image: &RgbImage, mask: &GrayImage, params: GuidedParameters) -> Result<GrayImage> {
    use crate::cv::{float_mat, gray_image, luminance_mat, stage_error};
    use opencv::core::Mat;

    const STAGE: &str = "guided filter";

    let guide = luminance_mat(image).map_err(stage_error(STAGE))?;
    let source = float_mat(mask, 1.0 / 255.0).map_err(stage_error(STAGE))?;
    let mut filtered = Mat::default();
    opencv::ximgproc::guided_filter_def(
        &guide,
        &source,
        &mut filtered,
        params.radius as i32,
        f64::from(params.epsilon),
    )
    .map_err(stage_error(STAGE))?;
    gray_image(&filtered, 255.0, mask.width(), mask.height())
}
