//! Geometric and morphological parameter derivation
//!
//! Every size used by segmentation and refinement is derived from the image
//! dimensions and the kernel scale factor. All functions here are pure.

use crate::config::Margin;
use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};

/// Minimum inset used by the automatic margin rule
pub const MIN_AUTO_INSET: u32 = 5;
/// Automatic inset is `dimension / AUTO_INSET_DIVISOR` (2%)
pub const AUTO_INSET_DIVISOR: u32 = 50;
/// Smallest structuring-element size
pub const MIN_KERNEL_SIZE: u32 = 3;
/// Largest structuring-element size
pub const MAX_KERNEL_SIZE: u32 = 15;
/// Pixels of the shorter image side per unit of kernel size
pub const KERNEL_BASE_DIVISOR: u32 = 150;
/// Guided filter regularization
pub const GUIDED_EPSILON: f32 = 0.01;
/// Smallest guided filter radius
pub const MIN_GUIDED_RADIUS: u32 = 4;
/// Smallest Gaussian blur kernel size
pub const MIN_BLUR_SIZE: u32 = 5;

/// Integer seed rectangle for classical segmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InsetRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl InsetRect {
    /// Whether the pixel lies inside the rectangle
    #[must_use]
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x
            && py >= self.y
            && u64::from(px) < u64::from(self.x) + u64::from(self.width)
            && u64::from(py) < u64::from(self.y) + u64::from(self.height)
    }

    /// Number of pixels covered by the rectangle
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for InsetRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Gaussian blur parameters used by the `blur` edge mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurParameters {
    /// Odd kernel size in pixels
    pub size: u32,
    /// Standard deviation of the Gaussian
    pub sigma: f32,
}

/// Guided filter parameters used by the `guided` edge mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuidedParameters {
    /// Window radius in pixels
    pub radius: u32,
    /// Regularization constant
    pub epsilon: f32,
}

/// Fixed bilateral filter parameters used by the `bilateral` edge mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BilateralParameters {
    /// Neighbourhood diameter in pixels
    pub diameter: u32,
    /// Range sigma on the 0-255 scale
    pub sigma_color: f32,
    /// Spatial sigma in pixels
    pub sigma_space: f32,
}

impl Default for BilateralParameters {
    fn default() -> Self {
        Self {
            diameter: 9,
            sigma_color: 75.0,
            sigma_space: 75.0,
        }
    }
}

/// Everything derived from the image size and kernel scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedParameters {
    /// Structuring element size shared by close and open
    pub kernel_size: u32,
    pub blur: BlurParameters,
    pub guided: GuidedParameters,
    pub bilateral: BilateralParameters,
}

impl DerivedParameters {
    /// Derive refinement parameters for an image of the given size
    #[must_use]
    pub fn for_image(width: u32, height: u32, kernel_scale: f32) -> Self {
        let kernel_size = kernel_size(width.min(height), kernel_scale);
        Self {
            kernel_size,
            blur: blur_parameters(kernel_size),
            guided: guided_parameters(kernel_size),
            bilateral: BilateralParameters::default(),
        }
    }
}

/// Derive the seed rectangle for classical segmentation
///
/// An explicit margin is used for both axes. The automatic rule takes 2% of
/// each dimension independently, at least 5 pixels.
///
/// # Errors
/// - `InvalidGeometry` when the inset leaves no interior
pub fn inset_rect(width: u32, height: u32, margin: Margin) -> Result<InsetRect> {
    let (inset_x, inset_y) = match margin {
        Margin::Pixels(px) => (px, px),
        Margin::Auto => (
            (width / AUTO_INSET_DIVISOR).max(MIN_AUTO_INSET),
            (height / AUTO_INSET_DIVISOR).max(MIN_AUTO_INSET),
        ),
    };

    let interior_width = i64::from(width) - 2 * i64::from(inset_x);
    let interior_height = i64::from(height) - 2 * i64::from(inset_y);

    if interior_width <= 0 || interior_height <= 0 {
        return Err(BgRemovalError::invalid_geometry(format!(
            "inset ({inset_x}, {inset_y}) leaves no interior in a {width}x{height} image \
             (interior {interior_width}x{interior_height})"
        )));
    }

    Ok(InsetRect {
        x: inset_x,
        y: inset_y,
        width: interior_width as u32,
        height: interior_height as u32,
    })
}

/// Structuring-element size for the shorter image side
///
/// `round((base_dim / 150) * kernel_scale)` with integer division, clamped to
/// `[3, 15]` and bumped to the next odd number when even.
#[must_use]
pub fn kernel_size(base_dim: u32, kernel_scale: f32) -> u32 {
    let steps = f64::from(base_dim / KERNEL_BASE_DIVISOR);
    let scaled = (steps * f64::from(kernel_scale)).round();
    let clamped = if scaled.is_nan() {
        MIN_KERNEL_SIZE
    } else {
        scaled.clamp(f64::from(MIN_KERNEL_SIZE), f64::from(MAX_KERNEL_SIZE)) as u32
    };
    if clamped % 2 == 0 {
        clamped + 1
    } else {
        clamped
    }
}

/// Gaussian blur size and sigma for the `blur` edge mode
#[must_use]
pub fn blur_parameters(kernel_size: u32) -> BlurParameters {
    let mut size = (kernel_size * 2 + 1).max(MIN_BLUR_SIZE);
    if size % 2 == 0 {
        size += 1;
    }
    BlurParameters {
        size,
        sigma: size as f32 / 4.0,
    }
}

/// Guided filter radius and regularization for the `guided` edge mode
#[must_use]
pub fn guided_parameters(kernel_size: u32) -> GuidedParameters {
    GuidedParameters {
        radius: kernel_size.max(MIN_GUIDED_RADIUS),
        epsilon: GUIDED_EPSILON,
    }
}
