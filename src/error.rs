//! Error types for background removal operations

use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Error types for background removal operations
///
/// Every variant is fatal to the current image only. Nothing in the pipeline
/// retries; the caller decides whether to try again with different options.
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors raised by the `image` crate outside of decode/encode
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid option value, detected before the pipeline starts
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The derived seed rectangle has no interior
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Input bytes could not be decoded into an image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Result could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// The model produced a tensor of a rank the dispatcher cannot interpret
    #[error("Unsupported output shape {shape:?} (rank {rank}); expected rank 2, 3 or 4")]
    UnsupportedOutputShape {
        /// Offending tensor shape
        shape: Vec<usize>,
        /// Rank of the offending tensor
        rank: usize,
    },

    /// Model loading or inference call failures
    #[error("Inference error: {0}")]
    Inference(String),

    /// Failures inside a processing stage
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BgRemovalError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new invalid geometry error
    pub fn invalid_geometry<S: Into<String>>(msg: S) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an unsupported output shape error from a tensor shape
    #[must_use]
    pub fn unsupported_output_shape(shape: &[usize]) -> Self {
        Self::UnsupportedOutputShape {
            shape: shape.to_vec(),
            rank: shape.len(),
        }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    #[must_use]
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Whether the error was raised while validating options
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }
}
