//! RGBA composition of the original colour image and the refined mask

use crate::error::{BgRemovalError, Result};
use image::{GrayImage, Luma, Rgba, RgbImage, RgbaImage};

/// Append `mask` as the alpha channel of `image`
///
/// Colour channels are copied unchanged, including where alpha is zero.
///
/// # Errors
/// - `Processing` when the mask and image dimensions differ
pub fn compose_rgba(image: &RgbImage, mask: &GrayImage) -> Result<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(BgRemovalError::processing_stage_error(
            "compositing",
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

    let mut result = RgbaImage::new(image.width(), image.height());
    for ((color, alpha), out) in image.pixels().zip(mask.pixels()).zip(result.pixels_mut()) {
        *out = Rgba([color[0], color[1], color[2], alpha[0]]);
    }
    Ok(result)
}

/// Alpha channel of an RGBA image as a mask
#[must_use]
pub fn extract_alpha(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| Luma([image.get_pixel(x, y)[3]]))
}
