//! Source tree traversal shared by template aggregation and output mapping.

use std::path::{Component, Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::builder::BuildError;

/// A non-directory entry found under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path of the entry
    pub path: PathBuf,

    /// Path relative to the source root
    pub relative: PathBuf,

    /// Slash-joined relative path, used as the template key
    pub key: String,
}

impl SourceFile {
    /// Whether this entry is an HTML file.
    pub fn is_html(&self) -> bool {
        extension(&self.path) == Some("html")
    }
}

/// The text after the last `.` of the file name.
///
/// Unlike [`Path::extension`], a leading dot counts, so `.html` has the
/// extension `html`.
pub fn extension(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.rfind('.').map(|i| &name[i + 1..])
}

/// Compute the slash-normalized path of `path` relative to `root`.
///
/// Returns `None` when `path` is not under `root` or is `root` itself.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Iterate over every file below `source_root`, in file-name order.
///
/// `output_dir` is relative to `source_root`; the walk never descends into it.
/// A traversal error is yielded as a [`BuildError::ReadError`] and callers
/// are expected to stop at the first one.
pub fn source_files<'a>(
    source_root: &'a Path,
    output_dir: &'a Path,
) -> impl Iterator<Item = Result<SourceFile, BuildError>> + 'a {
    WalkDir::new(source_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| !is_excluded(source_root, output_dir, entry))
        .filter_map(move |entry| match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    return None;
                }
                let path = entry.into_path();
                let relative = path.strip_prefix(source_root).ok()?.to_path_buf();
                let key = relative_key(source_root, &path)?;
                Some(Ok(SourceFile {
                    path,
                    relative,
                    key,
                }))
            }
            Err(e) => Some(Err(BuildError::ReadError(e.to_string()))),
        })
}

fn is_excluded(source_root: &Path, output_dir: &Path, entry: &DirEntry) -> bool {
    match entry.path().strip_prefix(source_root) {
        Ok(relative) => !relative.as_os_str().is_empty() && relative.starts_with(output_dir),
        Err(_) => false,
    }
}
