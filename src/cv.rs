//! Conversions between `image` buffers and OpenCV matrices

use crate::error::{BgRemovalError, Result};
use image::{GrayImage, RgbImage};
use opencv::core::{Mat, CV_32FC1, CV_8UC1};
use opencv::imgproc;
use opencv::prelude::*;

/// Map an OpenCV error onto a processing error for `stage`
pub(crate) fn stage_error(stage: &'static str) -> impl Fn(opencv::Error) -> BgRemovalError {
    move |err| BgRemovalError::processing_stage_error(stage, &err.to_string(), None)
}

/// 8-bit, 3-channel BGR matrix holding a copy of `image`
pub(crate) fn bgr_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let rgb = Mat::from_slice(image.as_raw())?;
    let rgb = rgb.reshape(3, image.height() as i32)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

/// Single-channel float matrix of the image luminance scaled to [0, 1]
pub(crate) fn luminance_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let bgr = bgr_mat(image)?;
    let mut gray = Mat::default();
    imgproc::cvt_color_def(&bgr, &mut gray, imgproc::COLOR_BGR2GRAY)?;
    let mut scaled = Mat::default();
    gray.convert_to(&mut scaled, CV_32FC1, 1.0 / 255.0, 0.0)?;
    Ok(scaled)
}

/// Single-channel float matrix of `mask` multiplied by `scale`
pub(crate) fn float_mat(mask: &GrayImage, scale: f64) -> opencv::Result<Mat> {
    let flat = Mat::from_slice(mask.as_raw())?;
    let gray = flat.reshape(1, mask.height() as i32)?;
    let mut scaled = Mat::default();
    gray.convert_to(&mut scaled, CV_32FC1, scale, 0.0)?;
    Ok(scaled)
}

/// Saturating conversion of a single-channel matrix back into a mask
///
/// # Errors
/// - `Processing` when the matrix is not `width` by `height`
pub(crate) fn gray_image(mat: &Mat, scale: f64, width: u32, height: u32) -> Result<GrayImage> {
    let mut bytes = Mat::default();
    mat.convert_to(&mut bytes, CV_8UC1, scale, 0.0)
        .map_err(stage_error("matrix conversion"))?;
    let data = bytes
        .data_bytes()
        .map_err(stage_error("matrix conversion"))?
        .to_vec();
    GrayImage::from_raw(width, height, data).ok_or_else(|| {
        BgRemovalError::processing(format!(
            "OpenCV returned a {}x{} matrix for a {width}x{height} image",
            bytes.cols(),
            bytes.rows()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_bgr_mat_swaps_channels() {
        let image = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let mat = bgr_mat(&image).unwrap();
        assert_eq!((mat.cols(), mat.rows(), mat.channels()), (3, 2, 3));
        assert_eq!(&mat.data_bytes().unwrap()[..3], &[30, 20, 10]);
    }

    #[test]
    fn test_float_round_trip() {
        let mask = GrayImage::from_fn(4, 3, |x, y| Luma([(x * 60 + y) as u8]));
        let mat = float_mat(&mask, 1.0 / 255.0).unwrap();
        assert_eq!(mat.typ(), CV_32FC1);
        assert_eq!(gray_image(&mat, 255.0, 4, 3).unwrap(), mask);
    }

    #[test]
    fn test_luminance_weights() {
        let image = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let mat = luminance_mat(&image).unwrap();
        let value = *mat.at_2d::<f32>(0, 0).unwrap();
        assert!((value - 0.299).abs() < 0.01, "{value}");
    }

    #[test]
    fn test_gray_image_checks_size() {
        let mask = GrayImage::new(4, 4);
        let mat = float_mat(&mask, 1.0).unwrap();
        assert!(gray_image(&mat, 1.0, 5, 4).is_err());
    }
}
