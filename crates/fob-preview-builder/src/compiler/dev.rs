//! Live compilation used while serving.
//!
//! The bundle is kept in memory and served with `no-cache`. A debounced
//! file watcher on the story and config directories triggers rebuilds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::bundle::compile;
use super::output::EmittedFile;
use super::{BuildStats, DevCompilation};
use crate::diagnostics::ExtractedDiagnostic;
use crate::error::{BuildError, Result};
use crate::iframe::PreviewBundleConfig;
use crate::plugins::IFRAME_HTML;
use crate::request::PreviewEvent;

/// Quiet period after a change before rebuilding.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Path segments never worth a rebuild.
const IGNORED_SEGMENTS: &[&str] = &["node_modules", ".git", ".cache"];

/// In-memory bundle output keyed by URL path (`/iframe.html`).
#[derive(Debug, Clone, Default)]
pub struct BundleCache {
    files: HashMap<String, (Vec<u8>, &'static str)>,
}

impl BundleCache {
    pub fn from_files(files: Vec<EmittedFile>) -> Self {
        let files = files
            .into_iter()
            .map(|file| {
                let content_type = content_type_from_extension(&file.meta.file);
                (format!("/{}", file.meta.file), (file.contents, content_type))
            })
            .collect();
        Self { files }
    }

    pub fn get(&self, path: &str) -> Option<&(Vec<u8>, &'static str)> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn content_type_from_extension(filename: &str) -> &'static str {
    match Path::new(filename).extension().and_then(|e| e.to_str()) {
        Some("js" | "mjs") => "application/javascript",
        Some("map" | "json") => "application/json",
        Some("css") => "text/css",
        Some("html") => "text/html; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone)]
enum DevStatus {
    Building,
    Ready(BuildStats),
    Closed,
}

struct DevState {
    cache: RwLock<BundleCache>,
    status: watch::Sender<DevStatus>,
}

/// [`DevCompilation`] over Rolldown with an in-memory output cache.
pub struct RolldownDevCompilation {
    state: Arc<DevState>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl std::fmt::Debug for RolldownDevCompilation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolldownDevCompilation")
            .field("cached_files", &self.state.cache.read().len())
            .field("closed", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl RolldownDevCompilation {
    /// Start watching and kick off the first build in the background.
    pub fn start(
        config: PreviewBundleConfig,
        events: Option<broadcast::Sender<PreviewEvent>>,
    ) -> Result<Self> {
        let (status, _) = watch::channel(DevStatus::Building);
        let state = Arc::new(DevState {
            cache: RwLock::new(BundleCache::default()),
            status,
        });
        let (watcher, changes) = watch_dirs(&config.watch_dirs, &config.output_dir)?;
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(rebuild_loop(
            config,
            Arc::clone(&state),
            changes,
            events,
            shutdown.clone(),
        ));

        Ok(Self {
            state,
            shutdown,
            task: Mutex::new(Some(task)),
            watcher: Mutex::new(Some(watcher)),
        })
    }
}

async fn rebuild_loop(
    config: PreviewBundleConfig,
    state: Arc<DevState>,
    mut changes: mpsc::Receiver<PathBuf>,
    events: Option<broadcast::Sender<PreviewEvent>>,
    shutdown: CancellationToken,
) {
    let emit = |event: PreviewEvent| {
        if let Some(events) = &events {
            let _ = events.send(event);
        }
    };

    let mut first = true;
    loop {
        state.status.send_replace(DevStatus::Building);
        if !first {
            emit(PreviewEvent::BuildStarted);
        }

        let started = Instant::now();
        let stats = tokio::select! {
            _ = shutdown.cancelled() => break,
            compiled = compile(&config) => match compiled {
                Ok(compiled) => {
                    *state.cache.write() = BundleCache::from_files(compiled.files);
                    compiled.stats
                }
                Err(e) => BuildStats::failed(vec![ExtractedDiagnostic::error(e.to_string())]),
            },
        };

        if !first {
            if stats.has_errors() {
                let error = stats
                    .errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n");
                tracing::error!("Preview rebuild failed:\n{}", error);
                emit(PreviewEvent::BuildFailed { error });
            } else {
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::info!(duration_ms, "Preview rebuilt");
                emit(PreviewEvent::BuildCompleted { duration_ms });
            }
        }
        state.status.send_replace(DevStatus::Ready(stats));
        first = false;

        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = changes.recv() => {
                let Some(path) = changed else { break };
                tracing::debug!(path = %path.display(), "Preview source changed");
                tokio::time::sleep(DEBOUNCE).await;
                while changes.try_recv().is_ok() {}
            }
        }
    }

    state.status.send_replace(DevStatus::Closed);
}

/// Watch every existing directory in `dirs` recursively. Missing ones are
/// skipped: a story glob may name a directory that does not exist yet.
fn watch_dirs(
    dirs: &[PathBuf],
    output_dir: &Path,
) -> Result<(RecommendedWatcher, mpsc::Receiver<PathBuf>)> {
    let (tx, rx) = mpsc::channel(100);
    let output_dir = output_dir.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let Ok(event) = res else { return };
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }
        for path in event.paths {
            if should_ignore(&path, &output_dir) {
                continue;
            }
            // A full queue already guarantees a rebuild.
            let _ = tx.try_send(path);
        }
    })
    .map_err(watch_error)?;

    for dir in dirs {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "Not watching missing directory");
            continue;
        }
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(watch_error)?;
    }

    Ok((watcher, rx))
}

fn should_ignore(path: &Path, output_dir: &Path) -> bool {
    if path.starts_with(output_dir) {
        return true;
    }
    path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| IGNORED_SEGMENTS.contains(&name))
    })
}

fn watch_error(e: notify::Error) -> BuildError {
    BuildError::Io(std::io::Error::other(e))
}

async fn serve_cached(State(state): State<Arc<DevState>>, uri: Uri) -> Response {
    let path = match uri.path() {
        "/" => format!("/{}", IFRAME_HTML),
        path => path.to_string(),
    };

    let cache = state.cache.read();
    match cache.get(&path) {
        Some((contents, content_type)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, *content_type),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::from(contents.clone()),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain")],
            format!("File not found: {}", path),
        )
            .into_response(),
    }
}

#[async_trait]
impl DevCompilation for RolldownDevCompilation {
    fn router(&self) -> Router {
        Router::new()
            .fallback(serve_cached)
            .with_state(Arc::clone(&self.state))
    }

    async fn wait_until_valid(&self) -> Result<Option<BuildStats>> {
        let mut status = self.state.status.subscribe();
        let settled = status
            .wait_for(|status| !matches!(status, DevStatus::Building))
            .await;

        Ok(match settled {
            Ok(status) => match &*status {
                DevStatus::Ready(stats) => Some(stats.clone()),
                _ => None,
            },
            Err(_) => None,
        })
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        drop(self.watcher.lock().take());

        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await?;
        }
        self.state.status.send_replace(DevStatus::Closed);
        Ok(())
    }
}
