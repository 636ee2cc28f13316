//! Progress reporting service
//!
//! The pipeline never prints. It reports checkpoints to an injected
//! [`ProgressReporter`], so frontends decide whether and where progress is
//! shown (and can stay silent when the result is streamed to stdout).

use crate::config::{EdgeMode, ProcessingOptions, QualityPreset};
use crate::segmentation::SegmentationStrategy;
use crate::types::ProcessingTimings;
use instant::Instant;
use serde::Serialize;

/// Checkpoints reported while an image moves through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    /// Input decoded to an RGB image
    ImageLoaded,
    /// Inset and kernel parameters derived from the image size
    ParametersDerived,
    /// Raw segmentation mask produced
    SegmentationComplete,
    /// Morphological cleanup and edge smoothing finished
    RefinementComplete,
    /// RGBA result assembled
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::ImageLoaded => "Image loaded",
            ProcessingStage::ParametersDerived => "Parameters derived",
            ProcessingStage::SegmentationComplete => "Segmentation complete",
            ProcessingStage::RefinementComplete => "Mask refined",
            ProcessingStage::Completed => "Processing completed",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::ImageLoaded => 10,
            ProcessingStage::ParametersDerived => 15,
            ProcessingStage::SegmentationComplete => 70,
            ProcessingStage::RefinementComplete => 90,
            ProcessingStage::Completed => 100,
        }
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// What the pipeline is about to do with an image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingSummary {
    pub width: u32,
    pub height: u32,
    pub strategy: SegmentationStrategy,
    pub quality: QualityPreset,
    pub iterations: u32,
    pub edge_mode: EdgeMode,
    pub kernel_scale: f32,
    pub kernel_size: u32,
}

impl ProcessingSummary {
    #[must_use]
    pub fn new(width: u32, height: u32, options: &ProcessingOptions, kernel_size: u32) -> Self {
        Self {
            width,
            height,
            strategy: SegmentationStrategy::for_options(options),
            quality: options.quality,
            iterations: options.iterations,
            edge_mode: options.edge_mode,
            kernel_scale: options.kernel_scale,
            kernel_size,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    /// Checkpoint reached
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
    /// Resolved settings, attached once parameters are derived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ProcessingSummary>,
}

impl ProgressUpdate {
    /// Create a new progress update
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            summary: None,
            stage,
        }
    }

    /// Create a progress update with custom description
    #[must_use]
    pub fn with_description(
        stage: ProcessingStage,
        description: String,
        start_time: Instant,
    ) -> Self {
        Self {
            description,
            ..Self::new(stage, start_time)
        }
    }

    /// Attach the resolved processing settings
    #[must_use]
    pub fn with_summary(mut self, summary: ProcessingSummary) -> Self {
        self.summary = Some(summary);
        self
    }
}

/// Observer notified at pipeline checkpoints
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report processing completion with final timings
    fn report_completion(&self, timings: ProcessingTimings);

    /// Report an error during processing
    ///
    /// # Arguments
    /// * `stage` - Last checkpoint reached before the failure, if any
    /// * `error` - Error description
    fn report_error(&self, stage: Option<ProcessingStage>, error: &str);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: ProcessingTimings) {}

    fn report_error(&self, _stage: Option<ProcessingStage>, _error: &str) {}
}

/// Console progress reporter that writes through the `log` facade
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to show the settings summary and detailed timings
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn log_summary(summary: &ProcessingSummary) {
        log::info!("🖼️ Image size: {}x{}", summary.width, summary.height);
        match summary.strategy {
            SegmentationStrategy::Learned => log::info!("  Mode: ML"),
            SegmentationStrategy::Classical => {
                log::info!("  Mode: GrabCut");
                log::info!("  Quality: {}", summary.quality);
                log::info!("  Iterations: {}", summary.iterations);
            },
        }
        log::info!("  Edge mode: {}", summary.edge_mode);
        log::info!(
            "  Kernel scale: {} (kernel size {})",
            summary.kernel_scale,
            summary.kernel_size
        );
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            if let Some(summary) = &update.summary {
                Self::log_summary(summary);
            }
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::debug!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        log::info!("✅ Background removal completed in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  📊 Detailed timings:");
            log::info!("    • Image decode: {}ms", timings.image_decode_ms);
            log::info!("    • Model load: {}ms", timings.model_load_ms);
            log::info!("    • Segmentation: {}ms", timings.segmentation_ms);
            log::info!("    • Refinement: {}ms", timings.refinement_ms);
            log::info!("    • Compositing: {}ms", timings.compositing_ms);
        }
    }

    fn report_error(&self, stage: Option<ProcessingStage>, error: &str) {
        match stage {
            Some(stage) => log::error!("❌ Error after {}: {}", stage.description(), error),
            None => log::error!("❌ Error before processing started: {}", error),
        }
    }
}

/// Reporter emitting one JSON object per event on stderr
pub struct JsonProgressReporter;

impl JsonProgressReporter {
    fn emit(value: &serde_json::Value) {
        eprintln!("{value}");
    }
}

impl ProgressReporter for JsonProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        Self::emit(&serde_json::json!({
            "event": "progress",
            "update": update,
        }));
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        Self::emit(&serde_json::json!({
            "event": "completed",
            "timings": timings,
        }));
    }

    fn report_error(&self, stage: Option<ProcessingStage>, error: &str) {
        Self::emit(&serde_json::json!({
            "event": "error",
            "stage": stage,
            "message": error,
        }));
    }
}

/// Progress tracker that manages progress reporting for a processing operation
pub struct ProgressTracker {
    reporter: Box<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    #[must_use]
    pub fn new(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    /// Create a progress tracker with no-op reporting
    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Box::new(NoOpProgressReporter))
    }

    /// Create a progress tracker with console reporting
    #[must_use]
    pub fn console(verbose: bool) -> Self {
        Self::new(Box::new(ConsoleProgressReporter::new(verbose)))
    }

    /// Reset the clock and stage for a new image
    pub fn restart(&mut self) {
        self.start_time = Instant::now();
        self.current_stage = None;
    }

    /// Report progress for a specific stage
    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.report(ProgressUpdate::new(stage, self.start_time));
    }

    /// Report progress with custom description
    pub fn report_stage_with_description(&mut self, stage: ProcessingStage, description: String) {
        self.report(ProgressUpdate::with_description(
            stage,
            description,
            self.start_time,
        ));
    }

    /// Report that parameters are resolved, with the settings summary attached
    pub fn report_summary(&mut self, summary: ProcessingSummary) {
        self.report(
            ProgressUpdate::new(ProcessingStage::ParametersDerived, self.start_time)
                .with_summary(summary),
        );
    }

    fn report(&mut self, update: ProgressUpdate) {
        self.current_stage = Some(update.stage);
        self.reporter.report_progress(update);
    }

    /// Report completion with final timings
    pub fn report_completion(&self, timings: ProcessingTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report an error during processing
    pub fn report_error(&self, error: &str) {
        self.reporter.report_error(self.current_stage, error);
    }

    /// Get the elapsed time since tracking started
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Get the last checkpoint reached
    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("current_stage", &self.current_stage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Test progress reporter that captures reports for verification
    #[derive(Default)]
    struct TestProgressReporter {
        progress_updates: Arc<Mutex<Vec<ProgressUpdate>>>,
        completions: Arc<Mutex<Vec<ProcessingTimings>>>,
        errors: Arc<Mutex<Vec<(Option<ProcessingStage>, String)>>>,
    }

    impl ProgressReporter for TestProgressReporter {
        fn report_progress(&self, update: ProgressUpdate) {
            self.progress_updates.lock().unwrap().push(update);
        }

        fn report_completion(&self, timings: ProcessingTimings) {
            self.completions.lock().unwrap().push(timings);
        }

        fn report_error(&self, stage: Option<ProcessingStage>, error: &str) {
            self.errors.lock().unwrap().push((stage, error.to_string()));
        }
    }

    fn summary() -> ProcessingSummary {
        let options = ProcessingOptions::builder()
            .quality(QualityPreset::Fast)
            .use_ml(false)
            .build()
            .unwrap();
        ProcessingSummary::new(300, 200, &options, 3)
    }

    #[test]
    fn test_stage_percentages_increase() {
        let stages = [
            ProcessingStage::ImageLoaded,
            ProcessingStage::ParametersDerived,
            ProcessingStage::SegmentationComplete,
            ProcessingStage::RefinementComplete,
            ProcessingStage::Completed,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].progress_percentage() < pair[1].progress_percentage());
        }
        assert_eq!(ProcessingStage::Completed.progress_percentage(), 100);
    }

    #[test]
    fn test_progress_update_creation() {
        let update = ProgressUpdate::new(ProcessingStage::SegmentationComplete, Instant::now());
        assert_eq!(update.stage, ProcessingStage::SegmentationComplete);
        assert_eq!(update.progress, 70);
        assert_eq!(update.description, "Segmentation complete");
        assert!(update.summary.is_none());
    }

    #[test]
    fn test_summary_reflects_options() {
        let summary = summary();
        assert_eq!(summary.strategy, SegmentationStrategy::Classical);
        assert_eq!(summary.iterations, 5);
        assert_eq!(summary.edge_mode, EdgeMode::Blur);
        assert!((summary.kernel_scale - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_progress_tracker() {
        let reporter = TestProgressReporter::default();
        let updates = reporter.progress_updates.clone();
        let completions = reporter.completions.clone();
        let errors = reporter.errors.clone();

        let mut tracker = ProgressTracker::new(Box::new(reporter));
        tracker.report_error("before anything");
        tracker.report_stage_with_description(ProcessingStage::ImageLoaded, "Image loaded: 300x200".to_string());
        tracker.report_summary(summary());
        tracker.report_stage(ProcessingStage::SegmentationComplete);
        tracker.report_error("refinement failed");
        tracker.report_completion(ProcessingTimings::default());

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].description, "Image loaded: 300x200");
        assert_eq!(updates[1].stage, ProcessingStage::ParametersDerived);
        assert!(updates[1].summary.is_some());
        assert_eq!(updates[2].stage, ProcessingStage::SegmentationComplete);

        let errors = errors.lock().unwrap();
        assert_eq!(errors[0], (None, "before anything".to_string()));
        assert_eq!(
            errors[1],
            (Some(ProcessingStage::SegmentationComplete), "refinement failed".to_string())
        );
        assert_eq!(completions.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_restart_clears_stage() {
        let mut tracker = ProgressTracker::no_op();
        tracker.report_stage(ProcessingStage::Completed);
        assert_eq!(tracker.current_stage(), Some(ProcessingStage::Completed));
        tracker.restart();
        assert!(tracker.current_stage().is_none());
        assert!(tracker.elapsed_ms() < 1000);
    }

    #[test]
    fn test_update_serializes_to_json() {
        let update = ProgressUpdate::new(ProcessingStage::ParametersDerived, Instant::now())
            .with_summary(summary());
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["stage"], "parameters_derived");
        assert_eq!(value["progress"], 15);
        assert_eq!(value["summary"]["strategy"], "classical");
        assert_eq!(value["summary"]["width"], 300);

        let bare = serde_json::to_value(ProgressUpdate::new(ProcessingStage::Completed, Instant::now())).unwrap();
        assert!(bare.get("summary").is_none());
    }

    #[test]
    fn test_reporters_are_object_safe() {
        let reporters: Vec<Box<dyn ProgressReporter>> = vec![
            Box::new(NoOpProgressReporter),
            Box::new(ConsoleProgressReporter::new(true)),
            Box::new(JsonProgressReporter),
        ];
        for reporter in &reporters {
            reporter.report_progress(ProgressUpdate::new(ProcessingStage::ImageLoaded, Instant::now()));
            reporter.report_completion(ProcessingTimings::default());
            reporter.report_error(None, "test error");
        }
    }
}
