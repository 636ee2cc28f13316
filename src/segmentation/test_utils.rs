//! Deterministic segmenter for dispatcher and processor tests
//!
//! Builds without OpenCV, so pipeline tests that are not about segmentation
//! quality run in every feature combination.

use super::labels::{validate_seed, ForegroundSegmenter, Label, LabelRaster};
use crate::error::Result;
use crate::params::InsetRect;
use image::RgbImage;

/// Labels seed-rectangle pixels by whether they differ from the top-left colour
///
/// Pixels outside the rectangle stay definite background. On two-colour
/// synthetic images this matches what GrabCut converges to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorKeySegmenter;

impl ForegroundSegmenter for ColorKeySegmenter {
    fn segment(&self, image: &RgbImage, rect: InsetRect, _iterations: u32) -> Result<LabelRaster> {
        validate_seed(image, rect)?;
        let key = *image.get_pixel(0, 0);
        let mut labels = LabelRaster::new(image.width(), image.height(), Label::Background);
        for (x, y, pixel) in image.enumerate_pixels() {
            if rect.contains(x, y) {
                let label = if *pixel == key {
                    Label::ProbableBackground
                } else {
                    Label::ProbableForeground
                };
                labels.set(x, y, label);
            }
        }
        Ok(labels)
    }
}
