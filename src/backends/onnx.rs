//! ONNX Runtime backend implementation for learned segmentation
//!
//! Loads a saliency model (U2-Net, RMBG and similar single-output models)
//! from a file path and runs one synchronous inference per image.

use crate::error::{BgRemovalError, Result};
use crate::inference::{InferenceBackend, InputSpec};
use log;
use ndarray::{Array4, ArrayD};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::{self, value::Value};
use std::path::Path;

/// ONNX Runtime backend for running saliency models
#[derive(Debug, Default)]
pub struct OnnxBackend {
    session: Option<Session>,
    input_spec: Option<InputSpec>,
    initialized: bool,
}

impl OnnxBackend {
    /// Create a new, uninitialized ONNX backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the model file and create the session
    fn load_model(&mut self, model_path: &Path, intra_threads: usize) -> Result<std::time::Duration> {
        let model_load_start = std::time::Instant::now();

        if !model_path.is_file() {
            return Err(BgRemovalError::file_io_error(
                "load ONNX model",
                model_path,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "model file does not exist"),
            ));
        }

        log::debug!("Loading ML model: {}", model_path.display());

        let mut session_builder = Session::builder()
            .map_err(|e| {
                BgRemovalError::inference(format!("Failed to create session builder: {e}"))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                BgRemovalError::inference(format!("Failed to set optimization level: {e}"))
            })?;

        if intra_threads > 0 {
            session_builder = session_builder
                .with_intra_threads(intra_threads)
                .map_err(|e| {
                    BgRemovalError::inference(format!("Failed to set intra threads: {e}"))
                })?;
        }

        let session = session_builder.commit_from_file(model_path).map_err(|e| {
            BgRemovalError::inference(format!(
                "Failed to create session from model '{}': {e}",
                model_path.display()
            ))
        })?;

        let first_input = session.inputs.first().ok_or_else(|| {
            BgRemovalError::inference(format!(
                "Model '{}' declares no inputs",
                model_path.display()
            ))
        })?;
        let raw_dims: Vec<i64> = first_input
            .input_type
            .tensor_shape()
            .map(|shape| shape.iter().copied().collect())
            .unwrap_or_default();
        let input_spec = InputSpec::from_raw_dims(first_input.name.clone(), &raw_dims);

        log::debug!("✅ ONNX Runtime session created successfully");
        log::debug!("  - Input: {} {:?}", input_spec.name, raw_dims);
        log::debug!("  - Resolved input shape: {:?}", input_spec.resolved_shape());
        log::debug!("  - Optimization level: Level3");
        if intra_threads > 0 {
            log::debug!("  - Threading: {intra_threads} intra-op threads");
        }

        self.session = Some(session);
        self.input_spec = Some(input_spec);
        self.initialized = true;

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "📊 Model loading complete: {:.0}ms",
            model_load_time.as_secs_f64() * 1000.0
        );

        Ok(model_load_time)
    }
}

impl InferenceBackend for OnnxBackend {
    fn initialize(
        &mut self,
        model_path: &Path,
        intra_threads: usize,
    ) -> Result<Option<std::time::Duration>> {
        if self.initialized {
            return Ok(None); // No model loading time for already initialized backend
        }

        let model_load_time = self.load_model(model_path, intra_threads)?;
        Ok(Some(model_load_time))
    }

    fn input_spec(&self) -> Result<InputSpec> {
        self.input_spec
            .clone()
            .ok_or_else(|| BgRemovalError::internal("Backend not initialized"))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<ArrayD<f32>> {
        use std::time::Instant;

        if !self.initialized {
            return Err(BgRemovalError::internal("Backend not initialized"));
        }

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| BgRemovalError::internal("ONNX session not initialized"))?;

        let inference_start = Instant::now();
        log::debug!("🚀 Starting inference with input shape: {:?}", input.dim());

        let input_value = Value::from_array(input.clone()).map_err(|e| {
            BgRemovalError::inference(format!("Failed to convert input tensor: {e}"))
        })?;

        // Positional inputs: the first declared input receives the image
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| BgRemovalError::inference(format!("ONNX inference failed: {e}")))?;

        let output_tensor = {
            let keys: Vec<_> = outputs.keys().collect();
            let first_key = keys
                .first()
                .ok_or_else(|| BgRemovalError::inference("No output tensors found"))?;
            log::debug!("  📋 Using first output: {}", first_key);
            outputs
                .get(first_key)
                .ok_or_else(|| BgRemovalError::inference("First output tensor not found"))?
                .try_extract_array::<f32>()
                .map_err(|e| {
                    BgRemovalError::inference(format!("Failed to extract output tensor: {e}"))
                })?
                .to_owned()
        };

        log::info!(
            "📊 Inference complete: {:.2}ms, output shape {:?}",
            inference_start.elapsed().as_secs_f64() * 1000.0,
            output_tensor.shape()
        );

        Ok(output_tensor)
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
