//! Static site builder.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use crate::minify::{ExternalMinifier, Minifier, MinifyError, NoopMinifier};
use crate::templates::TemplateNamespace;
use crate::walk::{source_files, SourceFile};

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Source directory
    pub source_dir: PathBuf,

    /// Output directory, relative to the source directory
    pub output_dir: PathBuf,

    /// Minify CSS/JS/HTML output with external tools
    pub minify: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::from("docs"),
            minify: true,
        }
    }
}

impl BuildConfig {
    /// Absolute path of the source directory.
    pub fn source_root(&self) -> Result<PathBuf, BuildError> {
        fs::canonicalize(&self.source_dir).map_err(|e| {
            BuildError::ReadError(format!(
                "Source directory not found: {}: {}",
                self.source_dir.display(),
                e
            ))
        })
    }

    /// The output directory with `.` segments removed.
    ///
    /// It must stay strictly inside the source directory.
    pub fn output_relative(&self) -> Result<PathBuf, BuildError> {
        let mut relative = PathBuf::new();

        for component in self.output_dir.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(BuildError::ConfigError(format!(
                        "Output directory must be a relative path inside the source directory: {}",
                        self.output_dir.display()
                    )))
                }
            }
        }

        if relative.as_os_str().is_empty() {
            return Err(BuildError::ConfigError(
                "Output directory must not be the source directory".to_string(),
            ));
        }

        Ok(relative)
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of files written
    pub files: usize,

    /// Number of files rendered from templates
    pub rendered: usize,

    /// Number of files copied verbatim
    pub copied: usize,

    /// Number of templates in the namespace
    pub templates: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to read source: {0}")]
    ReadError(String),

    #[error("Failed to parse template: {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Failed to render template: {path}: {message}")]
    TemplateError { path: String, message: String },

    #[error("Failed to write output: {path}: {message}")]
    WriteError { path: String, message: String },

    #[error(transparent)]
    MinifyError(#[from] MinifyError),
}

impl BuildError {
    fn write(path: &Path, e: impl ToString) -> Self {
        BuildError::WriteError {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    }
}

/// Static site builder.
///
/// A build runs sequentially: templates are parsed first, then every source
/// file is written and minified before the next one is started. The first
/// error stops the build.
pub struct StaticBuilder {
    config: BuildConfig,
    minifier: Box<dyn Minifier>,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: BuildConfig) -> Self {
        let minifier: Box<dyn Minifier> = if config.minify {
            Box::new(ExternalMinifier::default())
        } else {
            Box::new(NoopMinifier)
        };

        Self { config, minifier }
    }

    /// Replace the minifier chosen from the configuration.
    pub fn with_minifier(mut self, minifier: impl Minifier + 'static) -> Self {
        self.minifier = Box::new(minifier);
        self
    }

    /// Build the static site.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        let source_root = self.config.source_root()?;
        let output_dir = self.config.output_relative()?;
        let output_root = source_root.join(&output_dir);

        self.minifier.check()?;

        let templates = TemplateNamespace::scan(&source_root, &output_dir)?;
        if let Some(root) = templates.root() {
            tracing::info!("Loaded {} templates (root: {})", templates.len(), root);
        }

        reset_output(&output_root)?;

        let mut rendered = 0;
        let mut copied = 0;

        for file in source_files(&source_root, &output_dir) {
            let file = file?;
            let dest = output_root.join(&file.relative);

            tracing::info!("{}", file.key);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::write(parent, e))?;
            }

            if file.is_html() && !templates.is_empty() {
                render_page(&templates, &file, &dest)?;
                rendered += 1;
            } else {
                copy_file(&file.path, &dest)?;
                copied += 1;
            }

            self.minifier.minify(&dest)?;
        }

        let duration = start.elapsed();

        Ok(BuildResult {
            files: rendered + copied,
            rendered,
            copied,
            templates: templates.len(),
            duration_ms: duration.as_millis() as u64,
            output_dir: output_root,
        })
    }
}

/// Delete the output directory if present and recreate it empty.
fn reset_output(output_root: &Path) -> Result<(), BuildError> {
    match fs::remove_dir_all(output_root) {
        Ok(()) => tracing::debug!("Removed previous output {}", output_root.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(BuildError::write(output_root, e)),
    }

    fs::create_dir_all(output_root).map_err(|e| BuildError::write(output_root, e))
}

fn render_page(
    templates: &TemplateNamespace,
    file: &SourceFile,
    dest: &Path,
) -> Result<(), BuildError> {
    let out = fs::File::create(dest).map_err(|e| BuildError::write(dest, e))?;
    let mut out = BufWriter::new(out);

    templates.render_to(&file.key, &mut out)?;

    out.flush().map_err(|e| BuildError::write(dest, e))
}

fn copy_file(source: &Path, dest: &Path) -> Result<(), BuildError> {
    let bytes = fs::read(source)
        .map_err(|e| BuildError::ReadError(format!("{}: {}", source.display(), e)))?;

    fs::write(dest, bytes).map_err(|e| BuildError::write(dest, e))
}
