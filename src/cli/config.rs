//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::{
    capabilities::Capabilities,
    config::{Margin, ProcessingOptions},
};
use anyhow::{Context, Result};

/// Convert CLI arguments to `ProcessingOptions`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Whether learned segmentation was requested, explicitly or by default
    pub(crate) fn use_ml(cli: &Cli, capabilities: Capabilities) -> bool {
        if cli.ml {
            true
        } else if cli.grabcut {
            false
        } else {
            capabilities.learned_segmentation
        }
    }

    /// Build `ProcessingOptions` from CLI arguments
    ///
    /// The preset provides defaults; any flag given explicitly wins.
    pub(crate) fn from_cli(cli: &Cli, capabilities: Capabilities) -> Result<ProcessingOptions> {
        let mut builder = ProcessingOptions::builder()
            .capabilities(capabilities)
            .quality(cli.quality.into())
            .use_ml(Self::use_ml(cli, capabilities))
            .intra_threads(cli.threads);

        if let Some(iterations) = cli.iterations {
            builder = builder.iterations(iterations);
        }
        if let Some(margin) = cli.margin {
            builder = builder.margin(Margin::Pixels(margin));
        }
        if let Some(edge_mode) = cli.edge_mode {
            builder = builder.edge_mode(edge_mode.into());
        }
        if let Some(model) = &cli.model {
            builder = builder.model_path(model.clone());
        }

        builder.build().context("Invalid configuration")
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli, capabilities: Capabilities) -> Result<()> {
        if !Self::use_ml(cli, capabilities) {
            return Ok(());
        }

        if !capabilities.learned_segmentation {
            anyhow::bail!(
                "ML mode not available: this binary was built without the `onnx` feature. \
                 Use --grabcut to use the GrabCut algorithm instead"
            );
        }

        let has_model = cli.model.as_deref().is_some_and(|m| !m.trim().is_empty());
        if !has_model {
            anyhow::bail!(
                "ML mode requires --model <path> to specify the model file. \
                 Use --grabcut to use the GrabCut algorithm instead"
            );
        }

        Ok(())
    }
}
