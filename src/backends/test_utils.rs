//! Test utilities and mock backends for testing inference functionality
//!
//! The mock implements `InferenceBackend` without a model file so dispatcher
//! and processor tests can script output tensor ranks and failures.

use crate::{
    error::{BgRemovalError, Result},
    inference::{InferenceBackend, InputSpec},
};
use instant::Duration;
use ndarray::{Array2, Array4, ArrayD, IxDyn};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Mock backend for testing
#[derive(Debug, Clone)]
pub struct MockBackend {
    /// Whether the backend has been initialized
    initialized: bool,
    /// Declared input dims (None = dynamic)
    input_dims: [Option<usize>; 4],
    /// Shape of the tensor returned by `infer`
    output_shape: Vec<usize>,
    /// 2-D saliency raster placed into the output tensor
    raster: Array2<f32>,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    /// Shape of the last input tensor seen by `infer`
    last_input_shape: Arc<Mutex<Option<Vec<usize>>>>,
    /// Whether to simulate initialization failure
    should_fail_init: bool,
    /// Whether to simulate inference failure
    should_fail_inference: bool,
}

impl MockBackend {
    fn with_output(output_shape: Vec<usize>, height: usize, width: usize) -> Self {
        Self {
            initialized: false,
            input_dims: [None, Some(3), None, None],
            output_shape,
            raster: Self::disk_raster(height, width),
            call_history: Arc::new(Mutex::new(Vec::new())),
            last_input_shape: Arc::new(Mutex::new(None)),
            should_fail_init: false,
            should_fail_inference: false,
        }
    }

    /// Mock returning a (1, 1, H, W) tensor
    #[must_use]
    pub fn rank4(height: usize, width: usize) -> Self {
        Self::with_output(vec![1, 1, height, width], height, width)
    }

    /// Mock returning a (1, H, W) tensor
    #[must_use]
    pub fn rank3(height: usize, width: usize) -> Self {
        Self::with_output(vec![1, height, width], height, width)
    }

    /// Mock returning a (H, W) tensor
    #[must_use]
    pub fn rank2(height: usize, width: usize) -> Self {
        Self::with_output(vec![height, width], height, width)
    }

    /// Mock returning a tensor of arbitrary shape filled with 0.5
    #[must_use]
    pub fn with_shape(shape: &[usize]) -> Self {
        let mut backend = Self::with_output(shape.to_vec(), 1, 1);
        backend.raster.fill(0.5);
        backend
    }

    /// Declare static input dims instead of the dynamic default
    #[must_use]
    pub fn with_input_dims(mut self, dims: [Option<usize>; 4]) -> Self {
        self.input_dims = dims;
        self
    }

    /// Replace the saliency raster (must match the output H and W)
    #[must_use]
    pub fn with_raster(mut self, raster: Array2<f32>) -> Self {
        self.raster = raster;
        self
    }

    /// Create a mock backend that will fail during initialization
    #[must_use]
    pub fn failing_init(mut self) -> Self {
        self.should_fail_init = true;
        self
    }

    /// Create a mock backend that will fail during inference
    #[must_use]
    pub fn failing_inference(mut self) -> Self {
        self.should_fail_inference = true;
        self
    }

    /// The raster the mock places in its output tensor
    #[must_use]
    pub fn raster(&self) -> &Array2<f32> {
        &self.raster
    }

    /// Shared handle to the call history
    #[must_use]
    pub fn call_history_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.call_history)
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    /// Shape of the last input tensor passed to `infer`
    pub fn last_input_shape(&self) -> Option<Vec<usize>> {
        self.last_input_shape.lock().unwrap().clone()
    }

    /// Record a method call for testing verification
    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }

    /// Disk of ones centred in the raster, zeros elsewhere
    fn disk_raster(height: usize, width: usize) -> Array2<f32> {
        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let radius = width.min(height) as f32 / 3.0;
        Array2::from_shape_fn((height, width), |(y, x)| {
            let dx = x as f32 + 0.5 - center_x;
            let dy = y as f32 + 0.5 - center_y;
            if (dx * dx + dy * dy).sqrt() < radius {
                1.0
            } else {
                0.0
            }
        })
    }

    fn build_output(&self) -> Result<ArrayD<f32>> {
        let (height, width) = self.raster.dim();
        let total: usize = self.output_shape.iter().product();
        let data = if total == height * width {
            self.raster.iter().copied().collect()
        } else {
            vec![0.5; total]
        };
        ArrayD::from_shape_vec(IxDyn(&self.output_shape), data)
            .map_err(|e| BgRemovalError::internal(format!("Mock output shape error: {e}")))
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self, _model_path: &Path, _intra_threads: usize) -> Result<Option<Duration>> {
        self.record_call("initialize");

        if self.should_fail_init {
            return Err(BgRemovalError::inference("Mock initialization failure"));
        }
        if self.initialized {
            return Ok(None);
        }

        self.initialized = true;
        Ok(Some(Duration::from_millis(1)))
    }

    fn input_spec(&self) -> Result<InputSpec> {
        if !self.initialized {
            return Err(BgRemovalError::internal("Backend not initialized"));
        }
        Ok(InputSpec {
            name: "input".to_string(),
            dims: self.input_dims,
        })
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        self.record_call("infer");

        if !self.initialized {
            return Err(BgRemovalError::internal("Backend not initialized"));
        }
        if self.should_fail_inference {
            return Err(BgRemovalError::inference("Mock inference failure"));
        }

        if let Ok(mut last) = self.last_input_shape.lock() {
            *last = Some(input.shape().to_vec());
        }

        self.build_output()
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls() {
        let mut backend = MockBackend::rank4(4, 4);
        backend.initialize(Path::new("m.onnx"), 0).unwrap();
        let input = Array4::<f32>::zeros((1, 3, 320, 320));
        let output = backend.infer(&input).unwrap();

        assert_eq!(output.shape(), &[1, 1, 4, 4]);
        assert_eq!(backend.get_call_history(), vec!["initialize", "infer"]);
        assert_eq!(backend.last_input_shape(), Some(vec![1, 3, 320, 320]));
    }

    #[test]
    fn test_mock_failures() {
        let mut backend = MockBackend::rank2(4, 4).failing_init();
        assert!(backend.initialize(Path::new("m.onnx"), 0).is_err());
        assert!(!backend.is_initialized());

        let mut backend = MockBackend::rank2(4, 4).failing_inference();
        backend.initialize(Path::new("m.onnx"), 0).unwrap();
        let input = Array4::<f32>::zeros((1, 3, 8, 8));
        assert!(matches!(
            backend.infer(&input),
            Err(BgRemovalError::Inference(_))
        ));
    }

    #[test]
    fn test_mock_output_ranks() {
        let input = Array4::<f32>::zeros((1, 3, 8, 8));
        for (mut backend, expected) in [
            (MockBackend::rank4(6, 5), vec![1, 1, 6, 5]),
            (MockBackend::rank3(6, 5), vec![1, 6, 5]),
            (MockBackend::rank2(6, 5), vec![6, 5]),
            (MockBackend::with_shape(&[2, 2, 2, 2, 2]), vec![2, 2, 2, 2, 2]),
        ] {
            backend.initialize(Path::new("m.onnx"), 0).unwrap();
            assert_eq!(backend.infer(&input).unwrap().shape(), expected.as_slice());
        }
    }
}
