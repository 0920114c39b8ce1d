//! The prebuilt preview runtime shell (`sb-preview`).
//!
//! One-shot builds copy it next to the bundle; serving mounts it read-only.

use std::path::{Path, PathBuf};

use axum::Router;
use axum::http::{HeaderValue, header};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::error::{BuildError, Result};
use crate::scope::{RunScope, ensure_not_cancelled};

/// URL prefix and output sub-directory of the runtime shell.
pub const PREVIEW_MOUNT: &str = "/sb-preview";
pub const PREVIEW_DIR_NAME: &str = "sb-preview";

/// Package holding the runtime shell under `dist/`.
pub const PREVIEW_PACKAGE: &str = "@storybook/preview";

/// The only extension copied from the runtime shell.
pub const RUNTIME_EXTENSION: &str = "mjs";

const IMMUTABLE_CACHE: &str = "public, max-age=300, immutable";

/// What a copy wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Destination paths relative to `sb-preview/`.
    pub files: Vec<PathBuf>,
    pub bytes: u64,
}

/// Copy the runtime shell into `<output_dir>/sb-preview`, keeping sub-paths.
///
/// Files are copied only when their extension is `mjs`; directories are
/// always walked, and directories left without runtime files are not created.
/// Once `scope` is cancelled no further file is copied.
pub async fn copy_preview_runtime(
    source_dir: &Path,
    output_dir: &Path,
    scope: &RunScope,
) -> Result<CopyReport> {
    let source_dir = source_dir.to_path_buf();
    let target_dir = output_dir.join(PREVIEW_DIR_NAME);

    scope
        .spawn_blocking(move |token| copy_tree(&source_dir, &target_dir, &token))
        .await
}

fn copy_tree(source_dir: &Path, target_dir: &Path, token: &CancellationToken) -> Result<CopyReport> {
    let mut report = CopyReport::default();

    for entry in WalkDir::new(source_dir).follow_links(true) {
        ensure_not_cancelled(token)?;
        let entry = entry.map_err(|e| BuildError::Io(std::io::Error::other(e)))?;
        if !entry.file_type().is_file() || !is_runtime_file(entry.path()) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| BuildError::Invariant(format!("walked outside the runtime shell: {}", e)))?;
        let target = target_dir.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        report.bytes += std::fs::copy(entry.path(), &target)?;
        report.files.push(relative.to_path_buf());
    }

    tracing::debug!(
        files = report.files.len(),
        bytes = report.bytes,
        target = %target_dir.display(),
        "Copied preview runtime"
    );
    Ok(report)
}

fn is_runtime_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == RUNTIME_EXTENSION)
}

/// Serve the runtime shell under `/sb-preview` with long-lived cache headers.
pub fn preview_static_router(source_dir: &Path) -> Router {
    let files = ServeDir::new(source_dir);
    Router::new().nest_service(
        PREVIEW_MOUNT,
        tower::ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static(IMMUTABLE_CACHE),
            ))
            .service(files),
    )
}

/// Locate `node_modules/<package>` walking up from `cwd`.
pub fn resolve_package_dir(package: &str, cwd: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .map(|dir| dir.join("node_modules").join(package))
        .find(|candidate| candidate.join("package.json").is_file())
}

/// The runtime shell directory: the explicit override, or the package's
/// `dist/` found from `cwd`.
pub fn preview_runtime_dir(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            cwd.join(dir)
        };
        return Ok(dir);
    }

    resolve_package_dir(PREVIEW_PACKAGE, cwd)
        .map(|package| package.join("dist"))
        .ok_or_else(|| {
            BuildError::Config(format!(
                "Could not find {} in node_modules above {}. Install it or set preview_runtime_dir.",
                PREVIEW_PACKAGE,
                cwd.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    #[tokio::test]
    async fn copies_only_runtime_files_keeping_subpaths() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("nested")).unwrap();
        fs::write(source.path().join("nested/runtime.mjs"), "export {};").unwrap();
        fs::write(source.path().join("nested/runtime.d.ts"), "").unwrap();
        fs::write(source.path().join("README.md"), "").unwrap();
        fs::write(source.path().join("LICENSE"), "").unwrap();

        let report = copy_preview_runtime(source.path(), out.path(), &RunScope::new())
            .await
            .unwrap();

        assert_eq!(report.files, vec![PathBuf::from("nested/runtime.mjs")]);
        assert_eq!(report.bytes, 10);
        assert!(out.path().join("sb-preview/nested/runtime.mjs").is_file());
        assert!(!out.path().join("sb-preview/nested/runtime.d.ts").exists());
        assert!(!out.path().join("sb-preview/README.md").exists());
        assert!(!out.path().join("sb-preview/LICENSE").exists());
    }

    #[tokio::test]
    async fn missing_source_fails() {
        let out = TempDir::new().unwrap();
        let err = copy_preview_runtime(&out.path().join("nope"), out.path(), &RunScope::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Io(_)));
    }

    #[tokio::test]
    async fn cancelled_scope_copies_nothing() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(source.path().join("a.mjs"), "export {};").unwrap();
        fs::write(source.path().join("b.mjs"), "export {};").unwrap();
        let scope = RunScope::new();
        scope.token().cancel();

        let err = copy_preview_runtime(source.path(), out.path(), &scope)
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Cancelled));
        assert!(!out.path().join("sb-preview").exists());
    }

    #[tokio::test]
    async fn static_router_sets_immutable_cache() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("runtime.mjs"), "export {};").unwrap();

        let response = preview_static_router(source.path())
            .oneshot(
                Request::builder()
                    .uri("/sb-preview/runtime.mjs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=300, immutable"
        );
    }

    #[test]
    fn finds_packages_in_ancestor_node_modules() {
        let root = TempDir::new().unwrap();
        let package = root.path().join("node_modules/@storybook/preview");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("package.json"), "{}").unwrap();
        let nested = root.path().join("apps/web");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(resolve_package_dir(PREVIEW_PACKAGE, &nested), Some(package.clone()));
        assert_eq!(
            preview_runtime_dir(None, &nested).unwrap(),
            package.join("dist")
        );
        assert!(resolve_package_dir("left-pad", &nested).is_none());
        assert_eq!(
            preview_runtime_dir(Some(Path::new("shell")), &nested).unwrap(),
            nested.join("shell")
        );
    }
}
