//! Frontend-facing services: image I/O and progress reporting

pub mod io;
pub mod progress;

pub use io::{ImageIOService, ImageSink, ImageSource, STDIO_TOKEN};
pub use progress::{
    ConsoleProgressReporter, JsonProgressReporter, NoOpProgressReporter, ProcessingStage,
    ProcessingSummary, ProgressReporter, ProgressTracker, ProgressUpdate,
};
