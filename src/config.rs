//! Configuration types for background removal operations
//!
//! Options are resolved in two layers: a [`QualityPreset`] supplies defaults
//! for iterations, edge mode and kernel scale, and any field set explicitly on
//! the builder replaces the preset value. Overrides are kept separate from the
//! preset until [`ProcessingOptionsBuilder::build`], so the order of builder
//! calls never changes the outcome.

use crate::capabilities::Capabilities;
use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Smallest accepted iteration count for classical segmentation
pub const MIN_ITERATIONS: u32 = 1;
/// Largest accepted iteration count for classical segmentation
pub const MAX_ITERATIONS: u32 = 20;

/// Quality presets trading speed for mask quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    /// Quick processing: few iterations and a plain Gaussian blur
    Fast,
    /// Good quality and speed (default)
    Balanced,
    /// Best results: more iterations and a larger structuring element
    Quality,
}

impl Default for QualityPreset {
    fn default() -> Self {
        Self::Balanced
    }
}

impl std::fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Balanced => write!(f, "balanced"),
            Self::Quality => write!(f, "quality"),
        }
    }
}

impl FromStr for QualityPreset {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "quality" => Ok(Self::Quality),
            other => Err(BgRemovalError::invalid_config(format!(
                "Invalid quality preset '{other}'. Use: fast, balanced, or quality"
            ))),
        }
    }
}

impl QualityPreset {
    /// All presets in ascending quality order
    pub const ALL: [QualityPreset; 3] = [Self::Fast, Self::Balanced, Self::Quality];

    /// Resolve the preset to its fixed parameter tuple
    ///
    /// | preset   | iterations | edge mode | kernel scale |
    /// |----------|-----------:|-----------|-------------:|
    /// | fast     |          5 | blur      |          0.5 |
    /// | balanced |          8 | guided    |          1.0 |
    /// | quality  |         12 | guided    |          1.5 |
    #[must_use]
    pub const fn parameters(self) -> PresetParameters {
        match self {
            Self::Fast => PresetParameters {
                iterations: 5,
                edge_mode: EdgeMode::Blur,
                kernel_scale: 0.5,
            },
            Self::Balanced => PresetParameters {
                iterations: 8,
                edge_mode: EdgeMode::Guided,
                kernel_scale: 1.0,
            },
            Self::Quality => PresetParameters {
                iterations: 12,
                edge_mode: EdgeMode::Guided,
                kernel_scale: 1.5,
            },
        }
    }
}

/// Edge refinement strategy applied after morphological cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Gaussian blur: cheapest, least edge-preserving
    Blur,
    /// Bilateral filter with fixed parameters
    Bilateral,
    /// Guided filter steered by the grayscale image (falls back to bilateral)
    Guided,
}

impl Default for EdgeMode {
    fn default() -> Self {
        Self::Guided
    }
}

impl std::fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blur => write!(f, "blur"),
            Self::Bilateral => write!(f, "bilateral"),
            Self::Guided => write!(f, "guided"),
        }
    }
}

impl FromStr for EdgeMode {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blur" => Ok(Self::Blur),
            "bilateral" => Ok(Self::Bilateral),
            "guided" => Ok(Self::Guided),
            other => Err(BgRemovalError::invalid_config(format!(
                "Invalid edge mode '{other}'. Use: blur, bilateral, or guided"
            ))),
        }
    }
}

/// Seed rectangle inset from each image edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Margin {
    /// 2% of each dimension, at least 5 pixels
    Auto,
    /// Fixed inset in pixels, applied to both axes
    Pixels(u32),
}

impl Default for Margin {
    fn default() -> Self {
        Self::Auto
    }
}

impl std::fmt::Display for Margin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Pixels(px) => write!(f, "{px}px"),
        }
    }
}

impl FromStr for Margin {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        match trimmed.parse::<i64>() {
            Ok(value) if value >= 0 => u32::try_from(value).map(Self::Pixels).map_err(|_| {
                BgRemovalError::config_value_error("margin", value, "0-4294967295", None)
            }),
            Ok(value) => Err(BgRemovalError::config_value_error(
                "margin",
                value,
                ">= 0 or auto",
                None,
            )),
            Err(_) => Err(BgRemovalError::invalid_config(format!(
                "Invalid margin '{trimmed}'. Use a non-negative pixel count or 'auto'"
            ))),
        }
    }
}

/// Parameter tuple produced by the preset resolver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetParameters {
    /// Classical segmentation iterations
    pub iterations: u32,
    /// Edge refinement strategy
    pub edge_mode: EdgeMode,
    /// Multiplier applied to the structuring-element size
    pub kernel_scale: f32,
}

impl PresetParameters {
    /// Apply explicit overrides on top of the preset values
    #[must_use]
    pub fn with_overrides(self, overrides: &PresetOverrides) -> Self {
        Self {
            iterations: overrides.iterations.unwrap_or(self.iterations),
            edge_mode: overrides.edge_mode.unwrap_or(self.edge_mode),
            kernel_scale: overrides.kernel_scale.unwrap_or(self.kernel_scale),
        }
    }
}

/// Fields the caller set explicitly; these always win over the preset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetOverrides {
    pub iterations: Option<u32>,
    pub edge_mode: Option<EdgeMode>,
    pub kernel_scale: Option<f32>,
}

/// Resolved options consumed by the processing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Preset the remaining defaults were taken from
    pub quality: QualityPreset,

    /// Classical segmentation iterations (1-20)
    pub iterations: u32,

    /// Seed rectangle inset
    pub margin: Margin,

    /// Edge refinement strategy
    pub edge_mode: EdgeMode,

    /// Multiplier applied to the structuring-element size (> 0)
    pub kernel_scale: f32,

    /// Use learned segmentation instead of the classical algorithm
    pub use_ml: bool,

    /// Path to the ONNX model; required when `use_ml` is set
    pub model_path: Option<String>,

    /// Number of intra-op threads for inference (0 = runtime default)
    pub intra_threads: usize,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        let preset = QualityPreset::default().parameters();
        Self {
            quality: QualityPreset::default(),
            iterations: preset.iterations,
            margin: Margin::default(),
            edge_mode: preset.edge_mode,
            kernel_scale: preset.kernel_scale,
            use_ml: Capabilities::probe().learned_segmentation,
            model_path: None,
            intra_threads: 0,
        }
    }
}

impl ProcessingOptions {
    /// Create a new options builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bg_remover::{EdgeMode, ProcessingOptions, QualityPreset};
    ///
    /// let options = ProcessingOptions::builder()
    ///     .quality(QualityPreset::Fast)
    ///     .edge_mode(EdgeMode::Bilateral)
    ///     .use_ml(false)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(options.iterations, 5);
    /// assert_eq!(options.edge_mode, EdgeMode::Bilateral);
    /// ```
    #[must_use]
    pub fn builder() -> ProcessingOptionsBuilder {
        ProcessingOptionsBuilder::default()
    }

    /// Parameters currently in effect for iterations, edge mode and kernel scale
    #[must_use]
    pub fn preset_parameters(&self) -> PresetParameters {
        PresetParameters {
            iterations: self.iterations,
            edge_mode: self.edge_mode,
            kernel_scale: self.kernel_scale,
        }
    }

    /// Model path if one is set and non-empty
    #[must_use]
    pub fn model_path(&self) -> Option<&str> {
        self.model_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - iterations: 1-20 (inclusive)
    /// - kernel scale: finite and strictly positive
    /// - model path: non-empty whenever `use_ml` is set
    ///
    /// # Errors
    /// - `InvalidConfig` naming the offending parameter
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(BgRemovalError::config_value_error(
                "iterations",
                self.iterations,
                "1-20",
                Some(QualityPreset::Balanced.parameters().iterations),
            ));
        }

        if !self.kernel_scale.is_finite() || self.kernel_scale <= 0.0 {
            return Err(BgRemovalError::config_value_error(
                "kernel scale",
                self.kernel_scale,
                "> 0",
                Some(1.0),
            ));
        }

        if self.use_ml && self.model_path().is_none() {
            return Err(BgRemovalError::invalid_config(
                "Learned segmentation requires a model path. \
                 Set a model path or use the classical segmentation mode instead",
            ));
        }

        Ok(())
    }
}

/// Builder for `ProcessingOptions`
#[derive(Debug, Clone)]
pub struct ProcessingOptionsBuilder {
    quality: QualityPreset,
    overrides: PresetOverrides,
    margin: Margin,
    use_ml: Option<bool>,
    model_path: Option<String>,
    intra_threads: usize,
    capabilities: Capabilities,
}

impl Default for ProcessingOptionsBuilder {
    fn default() -> Self {
        Self {
            quality: QualityPreset::default(),
            overrides: PresetOverrides::default(),
            margin: Margin::default(),
            use_ml: None,
            model_path: None,
            intra_threads: 0,
            capabilities: Capabilities::probe(),
        }
    }
}

impl ProcessingOptionsBuilder {
    /// Select the quality preset supplying default parameters
    #[must_use]
    pub fn quality(mut self, quality: QualityPreset) -> Self {
        self.quality = quality;
        self
    }

    /// Override the classical segmentation iteration count
    #[must_use]
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.overrides.iterations = Some(iterations);
        self
    }

    /// Set the seed rectangle inset
    #[must_use]
    pub fn margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }

    /// Override the edge refinement strategy
    #[must_use]
    pub fn edge_mode(mut self, edge_mode: EdgeMode) -> Self {
        self.overrides.edge_mode = Some(edge_mode);
        self
    }

    /// Override the structuring-element scale factor
    #[must_use]
    pub fn kernel_scale(mut self, kernel_scale: f32) -> Self {
        self.overrides.kernel_scale = Some(kernel_scale);
        self
    }

    /// Choose between learned and classical segmentation
    #[must_use]
    pub fn use_ml(mut self, use_ml: bool) -> Self {
        self.use_ml = Some(use_ml);
        self
    }

    /// Set the ONNX model path used by learned segmentation
    #[must_use]
    pub fn model_path<S: Into<String>>(mut self, model_path: S) -> Self {
        self.model_path = Some(model_path.into());
        self
    }

    /// Set number of intra-op threads for inference
    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads;
        self
    }

    /// Use the given capability set to pick the default segmentation mode
    #[must_use]
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Build and validate the options
    ///
    /// # Errors
    /// - Iterations outside 1-20
    /// - Non-positive or non-finite kernel scale
    /// - Learned segmentation selected without a model path
    pub fn build(self) -> Result<ProcessingOptions> {
        let resolved = self.quality.parameters().with_overrides(&self.overrides);

        let options = ProcessingOptions {
            quality: self.quality,
            iterations: resolved.iterations,
            margin: self.margin,
            edge_mode: resolved.edge_mode,
            kernel_scale: resolved.kernel_scale,
            use_ml: self
                .use_ml
                .unwrap_or(self.capabilities.learned_segmentation),
            model_path: self.model_path,
            intra_threads: self.intra_threads,
        };

        options.validate()?;
        Ok(options)
    }
}
