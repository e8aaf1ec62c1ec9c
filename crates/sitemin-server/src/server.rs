//! Preview server implementation.

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::TcpListener;

use crate::router::preview_router;

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Output directory to serve
    pub root: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on, 0 for any free port
    pub port: u16,

    /// Open browser on start
    pub open: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("docs"),
            host: "127.0.0.1".to_string(),
            port: 0,
            open: false,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Directory not found: {0}. Run 'sitemin build' first.")]
    MissingRoot(PathBuf),

    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("Server error: {0}")]
    ServeError(String),
}

/// Preview server for a built output directory.
pub struct PreviewServer {
    config: PreviewConfig,
}

/// A preview server bound to its address but not yet serving.
pub struct BoundPreview {
    listener: TcpListener,
    config: PreviewConfig,
    addr: SocketAddr,
}

impl PreviewServer {
    /// Create a new preview server.
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }

    /// Bind the listening socket.
    pub async fn bind(self) -> Result<BoundPreview, ServerError> {
        if !self.config.root.is_dir() {
            return Err(ServerError::MissingRoot(self.config.root));
        }

        let target = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&target)
            .await
            .map_err(|e| ServerError::BindError(target.clone(), e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(target, e.to_string()))?;

        Ok(BoundPreview {
            listener,
            config: self.config,
            addr,
        })
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> Result<(), ServerError> {
        self.bind().await?.serve().await
    }
}

impl BoundPreview {
    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL of the served site.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve the output directory, opening the browser if configured.
    pub async fn serve(self) -> Result<(), ServerError> {
        let url = self.url();
        tracing::info!("Serving {} at {}", self.config.root.display(), url);

        if self.config.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(self.listener, preview_router(self.config.root))
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))
    }
}
