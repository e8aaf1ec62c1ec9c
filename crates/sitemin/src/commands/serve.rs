//! Preview server command.

use std::path::PathBuf;

use anyhow::Result;
use sitemin_server::{PreviewConfig, PreviewServer};

use crate::config::ConfigFile;

/// Run the serve command.
pub async fn run(
    file_config: &ConfigFile,
    port: Option<u16>,
    dir: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let config = PreviewConfig {
        root: dir.unwrap_or_else(|| file_config.output_root()),
        host: file_config.serve.host.clone(),
        port: port.unwrap_or(file_config.serve.port),
        open,
    };

    PreviewServer::new(config).start().await?;

    Ok(())
}
