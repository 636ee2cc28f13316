//! Terminal spinner reporting pipeline checkpoints

use crate::services::{ProcessingStage, ProgressReporter, ProgressUpdate};
use crate::types::ProcessingTimings;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter drawing an `indicatif` spinner on stderr
pub struct SpinnerProgressReporter {
    bar: ProgressBar,
}

impl SpinnerProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Wrap an existing bar, for hidden bars in tests
    #[must_use]
    pub fn with_bar(bar: ProgressBar) -> Self {
        Self { bar }
    }

    /// Current position of the bar
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for SpinnerProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for SpinnerProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.bar.set_position(u64::from(update.progress));
        self.bar.set_message(update.description);
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        self.bar.finish_with_message(format!("✅ Completed in {}ms", timings.total_ms));
    }

    fn report_error(&self, stage: Option<ProcessingStage>, error: &str) {
        let message = match stage {
            Some(stage) => format!("❌ Failed after {}: {error}", stage.description()),
            None => format!("❌ Failed: {error}"),
        };
        self.bar.abandon_with_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instant::Instant;

    #[test]
    fn test_spinner_tracks_checkpoint_percentage() {
        let reporter = SpinnerProgressReporter::with_bar(ProgressBar::hidden());
        reporter.report_progress(ProgressUpdate::new(ProcessingStage::SegmentationComplete, Instant::now()));
        assert_eq!(reporter.position(), 70);

        reporter.report_progress(ProgressUpdate::new(ProcessingStage::Completed, Instant::now()));
        reporter.report_completion(ProcessingTimings::default());
        assert_eq!(reporter.position(), 100);
    }

    #[test]
    fn test_spinner_error_does_not_panic() {
        let reporter = SpinnerProgressReporter::with_bar(ProgressBar::hidden());
        reporter.report_error(Some(ProcessingStage::ImageLoaded), "boom");
        reporter.report_error(None, "boom");
    }
}
