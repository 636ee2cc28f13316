//! Background Remover HTTP service
//!
//! Serves `/health` and `/removebg` with one shared pipeline. Clients must
//! send the key from the `BG_API_KEY` environment variable in `X-Api-Key`.

use anyhow::{Context, Result};
use bg_remover::{init_cli_tracing, serve, ProcessingOptions, ServerConfig, TracingFormat};
use bg_remover::cli::CliQuality;
use clap::Parser;
use std::net::SocketAddr;

/// Background removal HTTP service
#[derive(Parser, Debug)]
#[command(author, version, about = "Serve background removal over HTTP", long_about = None)]
#[command(name = "bg-remover-server")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Path to an ONNX saliency model; without it requests use GrabCut
    #[arg(long, value_name = "PATH")]
    model: Option<String>,

    /// Quality preset applied to every request
    #[arg(short, long, value_enum, default_value_t = CliQuality::Balanced)]
    quality: CliQuality,

    /// Largest accepted request body in megabytes
    #[arg(long, default_value_t = 64)]
    max_body_mb: usize,

    /// Show detailed processing information (-vv for traces)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Plain log lines without colours, for containers and CI
    #[arg(long)]
    compact_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let format = if args.compact_logs {
        TracingFormat::Compact
    } else {
        TracingFormat::Console
    };
    init_cli_tracing(args.verbose, format).context("Failed to initialize tracing")?;

    let mut builder = ProcessingOptions::builder()
        .quality(args.quality.into())
        .use_ml(args.model.is_some());
    if let Some(model) = &args.model {
        builder = builder.model_path(model.as_str());
    }
    let options = builder.build().context("Invalid processing options")?;

    let config = ServerConfig::new(options)
        .with_bind(args.bind)
        .with_api_key_from_env()
        .with_max_body_bytes(args.max_body_mb * 1024 * 1024);

    serve(config).await.context("Server failed")
}
