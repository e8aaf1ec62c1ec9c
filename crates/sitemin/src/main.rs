//! sitemin CLI - build, minify and preview a static site.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "sitemin")]
#[command(about = "Render HTML templates, copy assets and minify a static site")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sitemin.toml config file
    #[arg(short, long, default_value = "sitemin.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site into the output directory
    Build {
        /// Source directory (defaults to config or ".")
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output directory, relative to the source (defaults to config or "docs")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip minification
        #[arg(long)]
        no_minify: bool,

        /// Serve the output and open it in the browser after building
        #[arg(long)]
        open: bool,
    },

    /// Preview a built site
    Serve {
        /// Port to listen on (defaults to config or any free port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory to serve (defaults to the configured output directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let file_config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Build {
            source,
            output,
            no_minify,
            open,
        } => {
            let minify = if no_minify { Some(false) } else { None };
            commands::build::run(&file_config, source, output, minify, open).await?;
        }
        Commands::Serve { port, dir, no_open } => {
            commands::serve::run(&file_config, port, dir, !no_open).await?;
        }
    }

    Ok(())
}
