//! Static site build command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use sitemin_server::{PreviewConfig, PreviewServer};
use sitemin_static::{BuildConfig, StaticBuilder};

use crate::config::ConfigFile;

/// Run the build command, then serve the result if `open` is set.
pub async fn run(
    file_config: &ConfigFile,
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    minify: Option<bool>,
    open: bool,
) -> Result<()> {
    tracing::info!("Building static site...");

    let config = BuildConfig {
        source_dir: source.unwrap_or_else(|| file_config.build.source.clone()),
        output_dir: output.unwrap_or_else(|| file_config.build.output.clone()),
        minify: minify.unwrap_or(file_config.build.minify),
    };

    if !config.minify {
        tracing::info!("Minification disabled");
    }

    let builder = StaticBuilder::new(config);
    let result = tokio::task::spawn_blocking(move || builder.build())
        .await
        .context("Build task failed")??;

    tracing::info!(
        "Built {} files ({} rendered, {} copied) from {} templates in {}ms",
        result.files,
        result.rendered,
        result.copied,
        result.templates,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    if open {
        PreviewServer::new(PreviewConfig {
            root: result.output_dir,
            host: file_config.serve.host.clone(),
            port: file_config.serve.port,
            open: true,
        })
        .start()
        .await?;
    }

    Ok(())
}
