//! Inference backend abstraction

use crate::error::Result;
use ndarray::{Array4, ArrayD};
use std::path::Path;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Input tensor dimensions substituted for dynamic axes: (batch, channels, height, width)
pub const DEFAULT_INPUT_SHAPE: (usize, usize, usize, usize) = (1, 3, 320, 320);

/// Declared model input, with `None` for dynamic or unspecified axes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    /// Name of the first model input
    pub name: String,
    /// Declared (batch, channels, height, width)
    pub dims: [Option<usize>; 4],
}

impl InputSpec {
    /// Concrete NCHW shape with defaults substituted for dynamic axes
    #[must_use]
    pub fn resolved_shape(&self) -> (usize, usize, usize, usize) {
        let [b, c, h, w] = self.dims;
        let (db, dc, dh, dw) = DEFAULT_INPUT_SHAPE;
        (
            b.unwrap_or(db),
            c.unwrap_or(dc),
            h.unwrap_or(dh),
            w.unwrap_or(dw),
        )
    }

    /// Build a spec from raw dimensions where non-positive values mean dynamic
    #[must_use]
    pub fn from_raw_dims(name: impl Into<String>, raw: &[i64]) -> Self {
        let mut dims = [None; 4];
        for (slot, value) in dims.iter_mut().zip(raw.iter()) {
            *slot = usize::try_from(*value).ok().filter(|v| *v > 0);
        }
        Self {
            name: name.into(),
            dims,
        }
    }
}

/// Trait for inference backends
pub trait InferenceBackend: Send {
    /// Load the model at `model_path`
    ///
    /// # Errors
    /// - Model file missing or unreadable
    /// - Runtime session creation failures
    fn initialize(&mut self, model_path: &Path, intra_threads: usize) -> Result<Option<Duration>>;

    /// Declared input tensor of the loaded model
    ///
    /// # Errors
    /// - Backend not initialized
    fn input_spec(&self) -> Result<InputSpec>;

    /// Run one inference call and return the first output tensor
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - Tensor conversion errors
    fn infer(&mut self, input: &Array4<f32>) -> Result<ArrayD<f32>>;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}
