//! Static build pipeline for sitemin.
//!
//! Walks a source tree, renders every HTML file through one shared template
//! namespace, copies everything else verbatim and minifies the results with
//! external command-line tools.

pub mod builder;
pub mod minify;
pub mod templates;
pub mod walk;

pub use builder::{BuildConfig, BuildError, BuildResult, StaticBuilder};
pub use minify::{ExternalMinifier, ExternalTools, Minifier, MinifyError, NoopMinifier, Tool};
pub use templates::TemplateNamespace;
pub use walk::{extension, relative_key, source_files, SourceFile};
