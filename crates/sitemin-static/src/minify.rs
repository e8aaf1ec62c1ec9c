//! Minification through external command-line tools.
//!
//! Each output file is rewritten in place by a tool chosen from its
//! extension: `css-minify` for stylesheets, `uglifyjs` for scripts and
//! `html-minifier` for markup. Other files are left untouched.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::walk::extension;

/// Minifies a written output file in place.
pub trait Minifier: Send + Sync {
    /// Verify that everything the minifier needs is available.
    fn check(&self) -> Result<(), MinifyError> {
        Ok(())
    }

    /// Minify the file at `path` in place.
    fn minify(&self, path: &Path) -> Result<(), MinifyError>;
}

/// Errors that can occur while minifying.
#[derive(Debug, thiserror::Error)]
pub enum MinifyError {
    #[error("Missing dependency {tool}: install it with `npm i -g {package}`")]
    MissingDependency { tool: String, package: String },

    #[error("Failed to run {tool}: {message}")]
    Spawn { tool: String, message: String },

    #[error("{tool} failed on {path} ({status}): {stderr}")]
    Failed {
        tool: String,
        path: String,
        status: String,
        stderr: String,
    },

    #[error("Minifier produced no output at {path}")]
    MissingOutput { path: String },

    #[error("Failed to rename {from} to {to}: {message}")]
    Rename {
        from: String,
        to: String,
        message: String,
    },
}

/// Minifier that leaves every file as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMinifier;

impl Minifier for NoopMinifier {
    fn minify(&self, _path: &Path) -> Result<(), MinifyError> {
        Ok(())
    }
}

/// An external command and the npm package that provides it.
#[derive(Debug, Clone)]
pub struct Tool {
    /// Program to execute
    pub program: String,

    /// Arguments placed before the per-file arguments
    pub args: Vec<String>,

    /// npm package to suggest when the program is missing
    pub package: String,
}

impl Tool {
    /// A bare program provided by `package`.
    pub fn new(program: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            package: package.into(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Check the tool answers `-h`.
    pub fn check(&self) -> Result<(), MinifyError> {
        let status = self
            .command()
            .arg("-h")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => {
                tracing::debug!("{} -h exited with {}", self.program, status);
                Err(self.missing())
            }
            Err(e) => {
                tracing::debug!("{} -h could not be started: {}", self.program, e);
                Err(self.missing())
            }
        }
    }

    fn missing(&self) -> MinifyError {
        MinifyError::MissingDependency {
            tool: self.program.clone(),
            package: self.package.clone(),
        }
    }

    fn run(&self, args: &[&OsStr], path: &Path) -> Result<(), MinifyError> {
        tracing::debug!("Running {} on {}", self.program, path.display());

        let output = self
            .command()
            .args(args)
            .output()
            .map_err(|e| MinifyError::Spawn {
                tool: self.program.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(MinifyError::Failed {
                tool: self.program.clone(),
                path: path.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// The external tools used per file type.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    pub css: Tool,
    pub js: Tool,
    pub html: Tool,
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self {
            css: Tool::new("css-minify", "css-minify"),
            js: Tool::new("uglifyjs", "uglify-js"),
            html: Tool::new("html-minifier", "html-minifier"),
        }
    }
}

/// Flags passed to `html-minifier` ahead of the output and input paths.
const HTML_MINIFIER_FLAGS: &[&str] = &[
    "--caseSensitive",
    "--collapse-whitespace",
    "--remove-comments",
    "--remove-optional-tags",
    "--remove-redundant-attributes",
    "--remove-script-type-attributes",
    "--remove-tag-whitespace",
    "--minify-css",
    "true",
    "--minify-js",
    "true",
];

/// Minifier backed by npm command-line tools.
#[derive(Debug, Clone, Default)]
pub struct ExternalMinifier {
    tools: ExternalTools,
}

impl ExternalMinifier {
    /// Create a minifier using the given tools.
    pub fn new(tools: ExternalTools) -> Self {
        Self { tools }
    }

    fn minify_css(&self, path: &Path) -> Result<(), MinifyError> {
        let dir = path.parent().unwrap_or(Path::new("."));

        self.tools.css.run(
            &[OsStr::new("-f"), path.as_os_str(), OsStr::new("-o"), dir.as_os_str()],
            path,
        )?;

        // css-minify writes `<stem>.min.css` next to the input.
        let produced = minified_path(path);
        if !produced.is_file() {
            return Err(MinifyError::MissingOutput {
                path: produced.display().to_string(),
            });
        }

        fs::rename(&produced, path).map_err(|e| MinifyError::Rename {
            from: produced.display().to_string(),
            to: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn minify_js(&self, path: &Path) -> Result<(), MinifyError> {
        self.tools.js.run(
            &[
                OsStr::new("--compress"),
                OsStr::new("--mangle"),
                OsStr::new("-o"),
                path.as_os_str(),
                path.as_os_str(),
            ],
            path,
        )
    }

    fn minify_html(&self, path: &Path) -> Result<(), MinifyError> {
        let mut args: Vec<&OsStr> = HTML_MINIFIER_FLAGS.iter().map(OsStr::new).collect();
        args.extend([OsStr::new("-o"), path.as_os_str(), path.as_os_str()]);

        self.tools.html.run(&args, path)
    }
}

impl Minifier for ExternalMinifier {
    fn check(&self) -> Result<(), MinifyError> {
        self.tools.css.check()?;
        self.tools.js.check()?;
        self.tools.html.check()
    }

    fn minify(&self, path: &Path) -> Result<(), MinifyError> {
        match extension(path) {
            Some("css") => self.minify_css(path),
            Some("js") => self.minify_js(path),
            Some("html") => self.minify_html(path),
            _ => Ok(()),
        }
    }
}

/// File name of the minified sibling: `style.css` becomes `style.min.css`.
pub fn minified_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match extension(path) {
        Some(ext) => {
            let stem = &name[..name.len() - ext.len() - 1];
            format!("{}.min.{}", stem, ext)
        }
        None => format!("{}.min", name),
    }
}

fn minified_path(path: &Path) -> PathBuf {
    path.with_file_name(minified_name(path))
}
