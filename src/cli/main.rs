//! Background Remover CLI Tool
//!
//! Command-line interface removing the background of one image per call.

use super::config::CliConfigBuilder;
use super::progress::SpinnerProgressReporter;
use crate::{
    capabilities::Capabilities,
    config::{EdgeMode, QualityPreset},
    processor::BackgroundRemovalProcessor,
    segmentation::SegmentationStrategy,
    services::{
        ConsoleProgressReporter, ImageIOService, ImageSink, ImageSource, JsonProgressReporter,
        NoOpProgressReporter, ProgressReporter,
    },
    tracing_config::{init_cli_tracing, spans, TracingFormat},
    types::RemovalResult,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::time::Instant;
use tracing::{debug, Instrument};

const AFTER_HELP: &str = "\
Quality Presets:
  fast      - Quick processing (5 iterations, blur)
  balanced  - Good quality and speed (8 iterations, guided)
  quality   - Best results (12 iterations, guided, 1.5x kernel)

Examples:
  bg-remover -i photo.jpg -o output.png --model u2net.onnx
  bg-remover -i photo.jpg -o output.png --grabcut -q quality
  bg-remover -i photo.jpg -o output.png --grabcut -n 15 -e guided -v
  cat photo.jpg | bg-remover -i - -o - --grabcut > output.png";

/// Background removal CLI tool
#[derive(Parser, Debug)]
#[command(author, version, about = "Remove image backgrounds", long_about = None)]
#[command(name = "bg-remover", after_help = AFTER_HELP)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image file path (use "-" for stdin)
    #[arg(short, long, value_name = "PATH")]
    pub input: String,

    /// Output PNG file path (use "-" for stdout)
    #[arg(short, long, value_name = "PATH")]
    pub output: String,

    /// Quality preset supplying default iterations, edge mode and kernel scale
    #[arg(short, long, value_enum, default_value_t = CliQuality::Balanced)]
    pub quality: CliQuality,

    /// Classical segmentation iterations (1-20, default from preset)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub iterations: Option<u32>,

    /// Edge margin/inset in pixels (default: auto)
    #[arg(short, long, value_name = "PIXELS")]
    pub margin: Option<u32>,

    /// Edge refinement strategy (default from preset)
    #[arg(short, long, value_enum)]
    pub edge_mode: Option<CliEdgeMode>,

    /// Show detailed processing information (-vv for traces)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Force learned segmentation (default when available)
    #[arg(long)]
    pub ml: bool,

    /// Use classical GrabCut segmentation instead of the learned model
    #[arg(long, conflicts_with = "ml")]
    pub grabcut: bool,

    /// Path to ONNX model file (U2-Net, RMBG, etc.)
    #[arg(long, value_name = "PATH")]
    pub model: Option<String>,

    /// Number of intra-op inference threads (0 = runtime default)
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub progress: bool,

    /// Emit progress events as JSON lines on stderr
    #[arg(long, conflicts_with = "progress")]
    pub json_progress: bool,
}

/// Quality preset as accepted on the command line
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliQuality {
    Fast,
    Balanced,
    Quality,
}

impl From<CliQuality> for QualityPreset {
    fn from(value: CliQuality) -> Self {
        match value {
            CliQuality::Fast => QualityPreset::Fast,
            CliQuality::Balanced => QualityPreset::Balanced,
            CliQuality::Quality => QualityPreset::Quality,
        }
    }
}

/// Edge refinement strategy as accepted on the command line
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliEdgeMode {
    Blur,
    Bilateral,
    Guided,
}

impl From<CliEdgeMode> for EdgeMode {
    fn from(value: CliEdgeMode) -> Self {
        match value {
            CliEdgeMode::Blur => EdgeMode::Blur,
            CliEdgeMode::Bilateral => EdgeMode::Bilateral,
            CliEdgeMode::Guided => EdgeMode::Guided,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose, TracingFormat::Console)
        .context("Failed to initialize tracing")?;

    let capabilities = Capabilities::probe();
    CliConfigBuilder::validate_cli(&cli, capabilities).context("Invalid CLI arguments")?;
    let options =
        CliConfigBuilder::from_cli(&cli, capabilities).context("Failed to build configuration")?;

    let source: ImageSource = cli.input.parse().context("Invalid input")?;
    let sink: ImageSink = cli.output.parse().context("Invalid output")?;
    let strategy = SegmentationStrategy::for_options(&options);

    debug!(capabilities = %capabilities, "Resolved build capabilities");
    debug!("Processing options: {options:?}");

    let mut processor = BackgroundRemovalProcessor::new(options)
        .context("Failed to create background removal processor")?;
    processor.set_progress_reporter(create_progress_reporter(&cli, &sink));

    let span = spans::session(&session_id, &strategy.to_string());
    let result = process(&mut processor, &source, &sink)
        .instrument(span)
        .await?;

    if let ImageSink::Path(path) = &sink {
        info!("✅ Background removed successfully -> {}", path.display());
        debug!(
            "Result {}x{} in {}ms",
            result.dimensions().0,
            result.dimensions().1,
            result.timings.total_ms
        );
    }

    Ok(())
}

/// Pick the progress observer for this invocation
///
/// Streaming the result to stdout always silences progress output.
pub(crate) fn create_progress_reporter(cli: &Cli, sink: &ImageSink) -> Box<dyn ProgressReporter> {
    if sink.is_stdout() {
        Box::new(NoOpProgressReporter)
    } else if cli.json_progress {
        Box::new(JsonProgressReporter)
    } else if cli.progress {
        Box::new(SpinnerProgressReporter::new())
    } else {
        Box::new(ConsoleProgressReporter::new(cli.verbose > 0))
    }
}

/// Read, process and write one image
async fn process(
    processor: &mut BackgroundRemovalProcessor,
    source: &ImageSource,
    sink: &ImageSink,
) -> Result<RemovalResult> {
    let start_time = Instant::now();

    let result = async {
        let bytes = ImageIOService::read_source(source)?;
        processor.process_bytes(&bytes)
    }
    .instrument(spans::file_processing(&source.to_string(), &sink.to_string()))
    .await
    .with_context(|| format!("Failed to remove background from {source}"))?;

    ImageIOService::write_sink(&result.image, sink)
        .with_context(|| format!("Failed to write result to {sink}"))?;

    debug!(
        "Processed {} in {:.2}s",
        source,
        start_time.elapsed().as_secs_f64()
    );
    Ok(result)
}
