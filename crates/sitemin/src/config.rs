//! Configuration file structure (sitemin.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub serve: ServeSettings,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct BuildSettings {
    #[serde(default = "default_source")]
    pub source: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_minify")]
    pub minify: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            minify: default_minify(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ServeSettings {
    #[serde(default = "default_host")]
    pub host: String,
    /// 0 lets the OS pick a free port
    #[serde(default)]
    pub port: u16,
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
        }
    }
}

impl ConfigFile {
    /// Where the built site lands.
    pub fn output_root(&self) -> PathBuf {
        self.build.source.join(&self.build.output)
    }
}

fn default_source() -> PathBuf {
    PathBuf::from(".")
}
fn default_output() -> PathBuf {
    PathBuf::from("docs")
}
fn default_minify() -> bool {
    true
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        tracing::info!("Loaded config from {}", path.display());
        return Ok(config);
    }
    Ok(ConfigFile::default())
}
