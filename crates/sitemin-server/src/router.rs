//! Request routing for the preview server.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use percent_encoding::percent_decode_str;
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// Page served for `/` and for directory requests.
pub const INDEX_PAGE: &str = "index.html";

/// Page served, from the root of the output directory, for missing paths.
pub const NOT_FOUND_PAGE: &str = "404.html";

/// What a request path resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An existing file
    File(PathBuf),

    /// The `index.html` of an existing directory
    DirectoryIndex(PathBuf),

    /// The site-wide not-found page
    NotFound(PathBuf),
}

impl Resolution {
    /// The file that should be served.
    pub fn path(&self) -> &Path {
        match self {
            Resolution::File(p) | Resolution::DirectoryIndex(p) | Resolution::NotFound(p) => p,
        }
    }
}

/// Resolve a request path against the output directory.
///
/// Filesystem errors other than a missing entry are returned as-is.
pub async fn resolve(root: &Path, request_path: &str) -> io::Result<Resolution> {
    let request_path = if request_path == "/" {
        "/index.html"
    } else {
        request_path
    };

    let not_found = || Resolution::NotFound(root.join(NOT_FOUND_PAGE));

    let Some(relative) = relative_request_path(request_path) else {
        return Ok(not_found());
    };
    let path = root.join(relative);

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => Ok(Resolution::DirectoryIndex(path.join(INDEX_PAGE))),
        Ok(_) => Ok(Resolution::File(path)),
        Err(e) if is_missing(&e) => Ok(not_found()),
        Err(e) => Err(e),
    }
}

/// Build a router serving `root` with index and not-found fallbacks.
pub fn preview_router(root: impl Into<PathBuf>) -> Router {
    Router::new()
        .fallback(serve_preview)
        .with_state(Arc::new(root.into()))
}

async fn serve_preview(State(root): State<Arc<PathBuf>>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    match resolve(&root, &path).await {
        Ok(Resolution::NotFound(page)) => {
            tracing::debug!("{} not found, serving {}", path, page.display());
            let mut response = serve_file(page, request).await;
            if response.status().is_success() {
                *response.status_mut() = StatusCode::NOT_FOUND;
            }
            response
        }
        Ok(resolution) => serve_file(resolution.path().to_path_buf(), request).await,
        Err(e) => {
            tracing::error!("Failed to resolve {}: {}", path, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn serve_file(path: PathBuf, request: Request) -> Response {
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// A path below a file, such as `page.html/extra`, counts as missing.
fn is_missing(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Turn a URL path into a relative filesystem path.
///
/// Returns `None` for paths that try to leave the root or do not decode
/// to UTF-8.
fn relative_request_path(request_path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();

    for segment in request_path.split('/') {
        let segment = percent_decode_str(segment).decode_utf8().ok()?;
        match &*segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains(['/', '\\', '\0']) => return None,
            s => relative.push(s),
        }
    }

    Some(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn output(files: &[(&str, &str)]) -> TempDir {
        let temp = tempdir().unwrap();
        for (path, content) in files {
            let path = temp.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        temp
    }

    async fn get(root: &Path, uri: &str) -> (StatusCode, String) {
        let response = preview_router(root)
            .oneshot(http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn serves_directory_index_and_not_found_page() {
        let temp = output(&[("a/index.html", "A"), ("404.html", "NF")]);

        assert_eq!(get(temp.path(), "/a/").await, (StatusCode::OK, "A".to_string()));
        assert_eq!(get(temp.path(), "/a").await, (StatusCode::OK, "A".to_string()));
        assert_eq!(
            get(temp.path(), "/missing").await,
            (StatusCode::NOT_FOUND, "NF".to_string())
        );
        // No index.html at the root: `/` falls back to the 404 page.
        assert_eq!(
            get(temp.path(), "/").await,
            (StatusCode::NOT_FOUND, "NF".to_string())
        );
    }

    #[tokio::test]
    async fn root_is_index_html() {
        let temp = output(&[("index.html", "home"), ("404.html", "NF")]);

        assert_eq!(get(temp.path(), "/").await, get(temp.path(), "/index.html").await);
        assert_eq!(get(temp.path(), "/").await, (StatusCode::OK, "home".to_string()));
    }

    #[tokio::test]
    async fn serves_files_with_content_type() {
        let temp = output(&[("css/site.css", "body{}")]);

        let response = preview_router(temp.path())
            .oneshot(
                http::Request::builder()
                    .uri("/css/site.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/css");
    }

    #[tokio::test]
    async fn not_found_page_is_shared_by_subdirectories() {
        let temp = output(&[
            ("404.html", "root NF"),
            ("blog/404.html", "blog NF"),
            ("blog/index.html", "blog"),
        ]);

        assert_eq!(
            get(temp.path(), "/blog/nope.html").await,
            (StatusCode::NOT_FOUND, "root NF".to_string())
        );
    }

    #[tokio::test]
    async fn missing_not_found_page_is_a_plain_404() {
        let temp = output(&[("index.html", "home")]);

        let (status, _) = get(temp.path(), "/missing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn parent_segments_never_escape_root() {
        let outer = output(&[("secret.txt", "secret"), ("site/404.html", "NF")]);
        let root = outer.path().join("site");

        assert_eq!(
            get(&root, "/../secret.txt").await,
            (StatusCode::NOT_FOUND, "NF".to_string())
        );
        assert_eq!(
            get(&root, "/%2e%2e/secret.txt").await,
            (StatusCode::NOT_FOUND, "NF".to_string())
        );
    }

    #[tokio::test]
    async fn decodes_percent_encoded_names() {
        let temp = output(&[("my page.html", "spaced")]);

        assert_eq!(
            get(temp.path(), "/my%20page.html").await,
            (StatusCode::OK, "spaced".to_string())
        );
    }

    #[tokio::test]
    async fn resolves_paths_below_files_as_missing() {
        let temp = output(&[("page.html", "p")]);

        let resolution = resolve(temp.path(), "/page.html/extra").await.unwrap();

        assert_eq!(
            resolution,
            Resolution::NotFound(temp.path().join(NOT_FOUND_PAGE))
        );
    }

    #[tokio::test]
    async fn filesystem_errors_are_server_errors() {
        let temp = output(&[("404.html", "NF")]);
        // A single name longer than any filesystem allows fails with
        // ENAMETOOLONG, which is not a missing entry.
        let uri = format!("/{}", "a".repeat(300));

        assert!(resolve(temp.path(), &uri).await.is_err());

        let (status, body) = get(temp.path(), &uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.is_empty());
    }

    #[test]
    fn decodes_segments_and_rejects_traversal() {
        assert_eq!(relative_request_path("/a/./b"), Some(PathBuf::from("a/b")));
        assert_eq!(relative_request_path("//a//"), Some(PathBuf::from("a")));
        assert_eq!(relative_request_path("/a/../b"), None);
        assert_eq!(relative_request_path("/a%2fb"), None);
        assert_eq!(relative_request_path("/%zz"), Some(PathBuf::from("%zz")));
        assert_eq!(relative_request_path("/%+41"), Some(PathBuf::from("%+41")));
        assert_eq!(relative_request_path("/%c3%a9t%c3%a9"), Some(PathBuf::from("été")));
        assert_eq!(relative_request_path("/%ff"), None);
    }
}
