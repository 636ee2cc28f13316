//! Error handling and edge case testing
//!
//! Covers configuration rejection, geometry failures, undecodable input and
//! malformed model outputs across the public API.

use bg_remover::{
    remove_background_from_bytes, BackendFactory, BackgroundRemovalProcessor, BgRemovalError,
    Capabilities, ClassicalOnlyFactory, EdgeMode, ImageSink, ImageSource, InferenceBackend,
    InputSpec, Margin, ProcessingOptions, Result,
};
use image::{Rgb, RgbImage};
use instant::Duration;
use ndarray::{Array4, ArrayD, IxDyn};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Backend recording calls and returning a tensor of a fixed shape
struct ShapedBackend {
    shape: Vec<usize>,
    calls: Arc<Mutex<Vec<&'static str>>>,
    initialized: bool,
}

impl InferenceBackend for ShapedBackend {
    fn initialize(&mut self, _model_path: &Path, _intra_threads: usize) -> Result<Option<Duration>> {
        self.calls.lock().unwrap().push("initialize");
        self.initialized = true;
        Ok(None)
    }

    fn input_spec(&self) -> Result<InputSpec> {
        Ok(InputSpec::from_raw_dims("input", &[-1, 3, 16, 16]))
    }

    fn infer(&mut self, _input: &Array4<f32>) -> Result<ArrayD<f32>> {
        self.calls.lock().unwrap().push("infer");
        Ok(ArrayD::from_elem(IxDyn(&self.shape), 0.5))
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

struct ShapedFactory {
    shape: Vec<usize>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl ShapedFactory {
    fn new(shape: &[usize]) -> (Self, Arc<Mutex<Vec<&'static str>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                shape: shape.to_vec(),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl BackendFactory for ShapedFactory {
    fn create_backend(&self) -> Result<Box<dyn InferenceBackend>> {
        Ok(Box::new(ShapedBackend {
            shape: self.shape.clone(),
            calls: Arc::clone(&self.calls),
            initialized: false,
        }))
    }

    fn supports_learned_segmentation(&self) -> bool {
        true
    }
}

fn flat_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([120, 120, 120]))
}

fn learned_options() -> ProcessingOptions {
    ProcessingOptions::builder()
        .use_ml(true)
        .model_path("model.onnx")
        .build()
        .unwrap()
}

#[test]
fn test_config_validation_edge_cases() {
    // Boundary iteration counts
    assert!(ProcessingOptions::builder().use_ml(false).iterations(1).build().is_ok());
    assert!(ProcessingOptions::builder().use_ml(false).iterations(20).build().is_ok());

    let err = ProcessingOptions::builder()
        .use_ml(false)
        .iterations(0)
        .build()
        .unwrap_err();
    assert!(err.is_config_error());
    assert!(err.to_string().contains("iterations"));

    let err = ProcessingOptions::builder()
        .use_ml(false)
        .iterations(21)
        .build()
        .unwrap_err();
    assert!(err.is_config_error());

    for scale in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        let result = ProcessingOptions::builder()
            .use_ml(false)
            .kernel_scale(scale)
            .build();
        assert!(result.is_err(), "kernel scale {scale} should be rejected");
    }
}

#[test]
fn test_learned_mode_with_empty_model_fails_before_inference() {
    assert!(ProcessingOptions::builder().use_ml(true).model_path("").build().is_err());
    assert!(ProcessingOptions::builder().use_ml(true).build().is_err());

    // Options mutated after building are checked again by the processor
    let mut options = ProcessingOptions::builder().use_ml(false).build().unwrap();
    options.use_ml = true;
    options.model_path = Some("  ".to_string());

    let (factory, calls) = ShapedFactory::new(&[16, 16]);
    let err = BackgroundRemovalProcessor::with_factory(options, Box::new(factory)).unwrap_err();
    assert!(matches!(err, BgRemovalError::InvalidConfig(_)));
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_learned_mode_without_capability() {
    let err = BackgroundRemovalProcessor::with_factory(learned_options(), Box::new(ClassicalOnlyFactory))
        .and_then(|mut processor| processor.process_rgb(&flat_image(32, 32)))
        .unwrap_err();
    assert!(matches!(err, BgRemovalError::InvalidConfig(_)));
    assert!(err.to_string().contains("not available"));
}

#[test]
fn test_guided_request_falls_back_without_capability() {
    let options = ProcessingOptions::builder()
        .use_ml(true)
        .model_path("model.onnx")
        .edge_mode(EdgeMode::Guided)
        .build()
        .unwrap();
    let (factory, _) = ShapedFactory::new(&[16, 16]);
    let capabilities = Capabilities::full().with_guided_filter(false);

    let mut processor =
        BackgroundRemovalProcessor::with_capabilities(options, Box::new(factory), capabilities)
            .unwrap();
    let result = processor.process_rgb(&flat_image(40, 40)).unwrap();
    assert_eq!(result.dimensions(), (40, 40));
}

#[test]
fn test_invalid_geometry() {
    let classical = |margin| {
        ProcessingOptions::builder()
            .use_ml(false)
            .margin(margin)
            .build()
            .unwrap()
    };

    // Automatic inset of 5 pixels consumes a 10x10 image
    let mut processor = BackgroundRemovalProcessor::new(classical(Margin::Auto)).unwrap();
    let err = processor.process_rgb(&flat_image(10, 10)).unwrap_err();
    assert!(matches!(err, BgRemovalError::InvalidGeometry(_)));

    let mut processor = BackgroundRemovalProcessor::new(classical(Margin::Pixels(20))).unwrap();
    let err = processor.process_rgb(&flat_image(40, 100)).unwrap_err();
    assert!(matches!(err, BgRemovalError::InvalidGeometry(_)));

    // Empty images are rejected whichever strategy is selected
    let mut processor = BackgroundRemovalProcessor::new(classical(Margin::Auto)).unwrap();
    let err = processor.process_rgb(&RgbImage::new(0, 0)).unwrap_err();
    assert!(matches!(err, BgRemovalError::InvalidGeometry(_)));
}

#[test]
fn test_unsupported_output_ranks() {
    for shape in [vec![256], vec![1, 1, 1, 16, 16]] {
        let (factory, calls) = ShapedFactory::new(&shape);
        let mut processor =
            BackgroundRemovalProcessor::with_factory(learned_options(), Box::new(factory)).unwrap();
        let err = processor.process_rgb(&flat_image(32, 32)).unwrap_err();

        match err {
            BgRemovalError::UnsupportedOutputShape { rank, .. } => assert_eq!(rank, shape.len()),
            other => panic!("unexpected error for {shape:?}: {other}"),
        }
        assert_eq!(*calls.lock().unwrap(), vec!["initialize", "infer"]);
    }
}

#[test]
fn test_rank_three_output_is_accepted() {
    let (factory, _) = ShapedFactory::new(&[1, 16, 16]);
    let mut processor =
        BackgroundRemovalProcessor::with_factory(learned_options(), Box::new(factory)).unwrap();
    let result = processor.process_rgb(&flat_image(32, 24)).unwrap();

    // A uniform 0.5 raster maps to mid-grey alpha everywhere
    assert_eq!(result.mask.dimensions(), (32, 24));
    assert!(result.mask.pixels().all(|p| p[0] == 128));
}

#[tokio::test]
async fn test_decode_errors() {
    let options = ProcessingOptions::builder().use_ml(false).build().unwrap();

    let err = remove_background_from_bytes(b"definitely not an image", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, BgRemovalError::Decode(_)));

    let err = remove_background_from_bytes(&[], &options).await.unwrap_err();
    assert!(matches!(err, BgRemovalError::Decode(_)));

    // Truncated PNG header
    let err = remove_background_from_bytes(&[0x89, b'P', b'N', b'G'], &options)
        .await
        .unwrap_err();
    assert!(matches!(err, BgRemovalError::Decode(_)));
}

#[tokio::test]
async fn test_missing_input_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.png");

    let options = ProcessingOptions::builder().use_ml(false).build().unwrap();
    let mut processor = BackgroundRemovalProcessor::new(options).unwrap();
    let err = processor.process_file(&missing).await.unwrap_err();

    assert!(matches!(err, BgRemovalError::Io(_)));
    assert!(err.to_string().contains("missing.png"));
}

#[test]
fn test_stream_tokens() {
    assert!(matches!("-".parse::<ImageSource>().unwrap(), ImageSource::Stdin));
    assert!("-".parse::<ImageSink>().unwrap().is_stdout());
    assert!(matches!("photo.jpg".parse::<ImageSource>().unwrap(), ImageSource::Path(_)));
    assert!("".parse::<ImageSink>().is_err());
}
