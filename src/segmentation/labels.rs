//! Segmentation labels and the classical segmenter seam

use crate::error::{BgRemovalError, Result};
use crate::params::InsetRect;
use image::RgbImage;

/// Four-way per-pixel segmentation label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Definite background
    Background,
    /// Definite foreground
    Foreground,
    /// Probable background
    ProbableBackground,
    /// Probable foreground
    ProbableForeground,
}

impl Label {
    /// Foreground or probable foreground
    #[must_use]
    pub const fn is_foreground(self) -> bool {
        matches!(self, Self::Foreground | Self::ProbableForeground)
    }

    /// Probable labels are the ones a segmenter may still revise
    #[must_use]
    pub const fn is_probable(self) -> bool {
        matches!(self, Self::ProbableBackground | Self::ProbableForeground)
    }
}

/// Row-major raster of segmentation labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRaster {
    width: u32,
    height: u32,
    labels: Vec<Label>,
}

impl LabelRaster {
    /// Raster filled with a single label
    #[must_use]
    pub fn new(width: u32, height: u32, fill: Label) -> Self {
        Self {
            width,
            height,
            labels: vec![fill; width as usize * height as usize],
        }
    }

    /// Definite background outside `rect`, probable foreground inside
    #[must_use]
    pub fn from_rect(width: u32, height: u32, rect: InsetRect) -> Self {
        let mut raster = Self::new(width, height, Label::Background);
        for y in 0..height {
            for x in 0..width {
                if rect.contains(x, y) {
                    raster.set(x, y, Label::ProbableForeground);
                }
            }
        }
        raster
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Label at (x, y), `None` when out of bounds
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Label> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.labels.get(self.index(x, y)).copied()
    }

    /// Overwrite the label at (x, y); out-of-bounds writes are ignored
    pub fn set(&mut self, x: u32, y: u32, label: Label) {
        if x < self.width && y < self.height {
            let index = self.index(x, y);
            if let Some(slot) = self.labels.get_mut(index) {
                *slot = label;
            }
        }
    }

    /// All labels in row-major order
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Raster from row-major labels
    ///
    /// # Errors
    /// - `Processing` when `labels` does not hold `width * height` entries
    pub fn from_labels(width: u32, height: u32, labels: Vec<Label>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if labels.len() != expected {
            return Err(BgRemovalError::processing(format!(
                "expected {expected} labels for a {width}x{height} raster, got {}",
                labels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            labels,
        })
    }

    /// Number of pixels carrying `label`
    #[must_use]
    pub fn count(&self, label: Label) -> usize {
        self.labels.iter().filter(|l| **l == label).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Rectangle-seeded segmentation primitive
pub trait ForegroundSegmenter: Send {
    /// Segment `image` starting from `rect`, running `iterations` passes
    ///
    /// # Errors
    /// - `InvalidGeometry` when the image is empty or `rect` does not fit inside it
    fn segment(&self, image: &RgbImage, rect: InsetRect, iterations: u32) -> Result<LabelRaster>;
}

/// Reject empty images and seed rectangles that leave the image
///
/// # Errors
/// - `InvalidGeometry` describing which constraint failed
pub fn validate_seed(image: &RgbImage, rect: InsetRect) -> Result<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(BgRemovalError::invalid_geometry(format!(
            "cannot segment an empty {width}x{height} image"
        )));
    }
    let fits = rect.width > 0
        && rect.height > 0
        && u64::from(rect.x) + u64::from(rect.width) <= u64::from(width)
        && u64::from(rect.y) + u64::from(rect.height) <= u64::from(height);
    if !fits {
        return Err(BgRemovalError::invalid_geometry(format!(
            "seed rectangle {rect} does not fit inside a {width}x{height} image"
        )));
    }
    Ok(())
}
