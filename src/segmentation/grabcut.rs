//! Rectangle-seeded GrabCut through OpenCV
//!
//! Pixels outside the seed rectangle are definite background and pixels
//! inside start as probable foreground. OpenCV refits its colour mixtures and
//! relabels the probable pixels with a graph cut on every iteration.

use super::labels::{validate_seed, ForegroundSegmenter, Label, LabelRaster};
use crate::cv::{bgr_mat, stage_error};
use crate::error::{BgRemovalError, Result};
use crate::params::InsetRect;
use image::RgbImage;
use opencv::core::{Mat, Rect, Scalar, CV_8UC1};
use opencv::imgproc;
use opencv::prelude::*;
use tracing::{span, Level};

const STAGE: &str = "grabcut";

/// `cv::grabCut` initialized from the seed rectangle
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvSegmenter;

impl OpenCvSegmenter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ForegroundSegmenter for OpenCvSegmenter {
    fn segment(&self, image: &RgbImage, rect: InsetRect, iterations: u32) -> Result<LabelRaster> {
        validate_seed(image, rect)?;
        let (width, height) = image.dimensions();
        let _span = span!(Level::DEBUG, "grabcut", width, height, iterations).entered();

        let source = bgr_mat(image).map_err(stage_error(STAGE))?;
        let mut mask = Mat::new_rows_cols_with_default(
            height as i32,
            width as i32,
            CV_8UC1,
            Scalar::all(f64::from(imgproc::GC_BGD)),
        )
        .map_err(stage_error(STAGE))?;
        let mut background_model = Mat::default();
        let mut foreground_model = Mat::default();

        imgproc::grab_cut(
            &source,
            &mut mask,
            Rect::new(rect.x as i32, rect.y as i32, rect.width as i32, rect.height as i32),
            &mut background_model,
            &mut foreground_model,
            iterations as i32,
            imgproc::GC_INIT_WITH_RECT,
        )
        .map_err(stage_error(STAGE))?;

        let labels = mask
            .data_bytes()
            .map_err(stage_error(STAGE))?
            .iter()
            .map(|value| label_from_grabcut(*value))
            .collect::<Result<Vec<_>>>()?;
        LabelRaster::from_labels(width, height, labels)
    }
}

/// Decode one value of an OpenCV GrabCut mask
///
/// # Errors
/// - `Processing` for values outside the four GrabCut classes
pub fn label_from_grabcut(value: u8) -> Result<Label> {
    match i32::from(value) {
        imgproc::GC_BGD => Ok(Label::Background),
        imgproc::GC_FGD => Ok(Label::Foreground),
        imgproc::GC_PR_BGD => Ok(Label::ProbableBackground),
        imgproc::GC_PR_FGD => Ok(Label::ProbableForeground),
        other => Err(BgRemovalError::processing_stage_error(
            STAGE,
            &format!("unexpected mask value {other}"),
            None,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn square_on_background(size: u32, square: std::ops::Range<u32>) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if square.contains(&x) && square.contains(&y) {
                Rgb([220, 30, 30])
            } else {
                Rgb([30, 40, 210])
            }
        })
    }

    #[test]
    fn test_label_from_grabcut() {
        assert_eq!(label_from_grabcut(0).unwrap(), Label::Background);
        assert_eq!(label_from_grabcut(1).unwrap(), Label::Foreground);
        assert_eq!(label_from_grabcut(2).unwrap(), Label::ProbableBackground);
        assert_eq!(label_from_grabcut(3).unwrap(), Label::ProbableForeground);
        assert!(matches!(label_from_grabcut(4), Err(BgRemovalError::Processing(_))));
    }

    #[test]
    fn test_segments_square_on_plain_background() {
        let image = square_on_background(40, 12..28);
        let rect = InsetRect {
            x: 5,
            y: 5,
            width: 30,
            height: 30,
        };
        let labels = OpenCvSegmenter::new().segment(&image, rect, 3).unwrap();

        assert_eq!(labels.width(), 40);
        assert_eq!(labels.height(), 40);
        // Outside the rectangle never changes
        assert_eq!(labels.get(0, 0), Some(Label::Background));
        assert_eq!(labels.get(39, 20), Some(Label::Background));
        // Square is foreground, the background colour inside the rectangle is not
        assert!(labels.get(20, 20).is_some_and(Label::is_foreground));
        assert!(labels.get(12, 12).is_some_and(Label::is_foreground));
        assert!(labels.get(7, 7).is_some_and(|l| !l.is_foreground()));
        assert!(labels.get(30, 8).is_some_and(|l| !l.is_foreground()));
    }

    #[test]
    fn test_rect_must_fit_image() {
        let image = square_on_background(10, 3..7);
        let rect = InsetRect {
            x: 5,
            y: 5,
            width: 6,
            height: 2,
        };
        let err = OpenCvSegmenter::new().segment(&image, rect, 1).unwrap_err();
        assert!(matches!(err, BgRemovalError::InvalidGeometry(_)));
    }
}
