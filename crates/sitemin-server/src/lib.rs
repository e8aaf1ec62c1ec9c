//! Preview server for built sitemin sites.
//!
//! Serves an output directory over plain HTTP, falling back to a directory's
//! `index.html` and to the site-wide `404.html`.

pub mod router;
pub mod server;

pub use router::{preview_router, resolve, Resolution};
pub use server::{BoundPreview, PreviewConfig, PreviewServer, ServerError};
