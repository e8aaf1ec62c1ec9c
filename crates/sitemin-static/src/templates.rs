//! Shared template namespace built from every HTML file in the source tree.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use minijinja::{context, Environment};

use crate::builder::BuildError;
use crate::walk::source_files;

/// All HTML templates of a site, keyed by their path relative to the source root.
///
/// Every template lives in the same environment, so any page can include,
/// extend or import another one by its relative path. The root template is
/// the lexicographically smallest key.
pub struct TemplateNamespace {
    env: Environment<'static>,
    keys: BTreeSet<String>,
}

impl TemplateNamespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            keys: BTreeSet::new(),
        }
    }

    /// Parse every HTML file below `source_root` into one namespace.
    ///
    /// `output_dir` (relative to `source_root`) is not scanned. The first read
    /// or parse failure aborts the scan.
    pub fn scan(source_root: &Path, output_dir: &Path) -> Result<Self, BuildError> {
        let mut namespace = Self::new();

        for file in source_files(source_root, output_dir) {
            let file = file?;
            if !file.is_html() {
                continue;
            }

            let bytes = fs::read(&file.path)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", file.path.display(), e)))?;

            // Non UTF-8 bytes become U+FFFD instead of failing the build.
            let source = String::from_utf8_lossy(&bytes).into_owned();
            namespace.add(&file.key, source)?;
        }

        Ok(namespace)
    }

    /// Parse `source` and register it under `key`.
    pub fn add(&mut self, key: &str, source: String) -> Result<(), BuildError> {
        self.env
            .add_template_owned(key.to_string(), source)
            .map_err(|e| BuildError::ParseError {
                path: key.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!("Parsed template {}", key);
        self.keys.insert(key.to_string());
        Ok(())
    }

    /// Key of the root template, if any template was found.
    pub fn root(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    /// Whether a template is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Number of templates in the namespace.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the namespace holds no templates.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Render the template registered under `key` with an empty context.
    pub fn render(&self, key: &str) -> Result<String, BuildError> {
        let tmpl = self.env.get_template(key).map_err(|e| template_error(key, e))?;
        tmpl.render(context! {}).map_err(|e| template_error(key, e))
    }

    /// Render the template registered under `key` into `out`.
    pub fn render_to<W: Write>(&self, key: &str, out: W) -> Result<(), BuildError> {
        let tmpl = self.env.get_template(key).map_err(|e| template_error(key, e))?;
        tmpl.render_to_write(context! {}, out)
            .map_err(|e| template_error(key, e))?;
        Ok(())
    }
}

impl Default for TemplateNamespace {
    fn default() -> Self {
        Self::new()
    }
}

fn template_error(key: &str, e: minijinja::Error) -> BuildError {
    BuildError::TemplateError {
        path: key.to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn site(files: &[(&str, &str)]) -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        for (path, content) in files {
            let path = temp.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        temp
    }

    #[test]
    fn renders_every_page_by_its_key() {
        let temp = site(&[
            ("index.html", "<h1>Home</h1>"),
            ("blog/post.html", "<p>Post</p>"),
            ("style.css", "body {}"),
        ]);

        let ns = TemplateNamespace::scan(temp.path(), Path::new("docs")).unwrap();

        assert_eq!(ns.len(), 2);
        assert_eq!(ns.keys().collect::<Vec<_>>(), vec!["blog/post.html", "index.html"]);
        assert_eq!(ns.render("index.html").unwrap(), "<h1>Home</h1>");
        assert_eq!(ns.render("blog/post.html").unwrap(), "<p>Post</p>");
        assert!(!ns.contains("style.css"));
    }

    #[test]
    fn templates_include_each_other_by_relative_path() {
        let temp = site(&[
            ("partials/nav.html", "<nav>menu</nav>"),
            ("index.html", r#"{% include "partials/nav.html" %}<main>Home</main>"#),
            (
                "layout.html",
                "<body>{% block body %}{% endblock %}</body>",
            ),
            (
                "about.html",
                r#"{% extends "layout.html" %}{% block body %}About{% endblock %}"#,
            ),
        ]);

        let ns = TemplateNamespace::scan(temp.path(), Path::new("docs")).unwrap();

        assert_eq!(
            ns.render("index.html").unwrap(),
            "<nav>menu</nav><main>Home</main>"
        );
        assert_eq!(ns.render("about.html").unwrap(), "<body>About</body>");
    }

    #[test]
    fn root_is_the_smallest_key() {
        let temp = site(&[
            ("z.html", "z"),
            ("a/deep.html", "deep"),
            ("a.html", "a"),
        ]);

        let ns = TemplateNamespace::scan(temp.path(), Path::new("docs")).unwrap();

        // "a.html" sorts before "a/deep.html" even though the walk visits
        // the directory first.
        assert_eq!(ns.root(), Some("a.html"));
    }

    #[test]
    fn empty_tree_has_no_root() {
        let temp = site(&[("style.css", "body {}")]);

        let ns = TemplateNamespace::scan(temp.path(), Path::new("docs")).unwrap();

        assert!(ns.is_empty());
        assert_eq!(ns.root(), None);
    }

    #[test]
    fn ignores_previous_output() {
        let temp = site(&[
            ("index.html", "fresh"),
            ("docs/index.html", "{% broken"),
        ]);

        let ns = TemplateNamespace::scan(temp.path(), Path::new("docs")).unwrap();

        assert_eq!(ns.keys().collect::<Vec<_>>(), vec!["index.html"]);
    }

    #[test]
    fn parse_error_aborts_scan() {
        let temp = site(&[
            ("good.html", "fine"),
            ("bad.html", "{% if %}"),
        ]);

        let result = TemplateNamespace::scan(temp.path(), Path::new("docs"));

        match result {
            Err(BuildError::ParseError { path, .. }) => assert_eq!(path, "bad.html"),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("expected a parse error"),
        }
    }

    #[test]
    fn reads_non_utf8_templates_lossily() {
        let temp = site(&[]);
        fs::write(temp.path().join("index.html"), b"<p>caf\xe9</p>").unwrap();

        let ns = TemplateNamespace::scan(temp.path(), Path::new("docs")).unwrap();

        assert_eq!(ns.render("index.html").unwrap(), "<p>caf\u{FFFD}</p>");
    }

    #[test]
    fn dotfile_named_html_is_a_template() {
        let temp = site(&[(".html", "{{ 1 + 1 }}")]);

        let ns = TemplateNamespace::scan(temp.path(), Path::new("docs")).unwrap();

        assert_eq!(ns.root(), Some(".html"));
        assert_eq!(ns.render(".html").unwrap(), "2");
    }

    #[test]
    fn missing_include_fails_at_render() {
        let mut ns = TemplateNamespace::new();
        ns.add("index.html", r#"{% include "nope.html" %}"#.to_string())
            .unwrap();

        let result = ns.render("index.html");

        assert!(matches!(result, Err(BuildError::TemplateError { .. })));
    }

    #[test]
    fn renders_into_writer() {
        let mut ns = TemplateNamespace::new();
        ns.add("index.html", "{{ 1 + 1 }}".to_string()).unwrap();

        let mut out = Vec::new();
        ns.render_to("index.html", &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "2");
    }
}
