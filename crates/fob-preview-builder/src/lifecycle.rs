//! Cancellable build lifecycle.
//!
//! A [`PreviewBuilder`] runs at most one preview build at a time, either
//! serving ([`PreviewBuilder::start`]) or one-shot ([`PreviewBuilder::build`]).
//! The run is a spawned task moving through [`LifecycleState`]s. Every await
//! inside it is raced against a sticky cancellation token, so
//! [`PreviewBuilder::cancel`] takes effect at the next checkpoint even when
//! it was requested before the run first suspended.

use std::future::{Future, IntoFuture};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::compiler::{BuildStats, Compiler, DevCompilation};
use crate::error::{BuildError, Result};
use crate::exit_code;
use crate::iframe::{PreviewBundleConfig, iframe_config};
use crate::presets::resolve_presets;
use crate::preview_assets::{copy_preview_runtime, preview_runtime_dir, preview_static_router};
use crate::request::{BuildRequest, PreviewEvent, PreviewRouter};
use crate::scope::RunScope;
use crate::timing::print_duration;

/// How long `cancel` waits for a live compilation to close.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Name of the build metadata file in the output directory.
pub const META_FILE: &str = "meta.json";

/// Checkpoints of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    ConfigResolving,
    CompilerInvoked,
    /// Serving: waiting for the first valid build.
    Serving,
    /// One-shot: compiled, writing metadata.
    Finalizing,
    Resolved,
    Cancelling,
}

/// Result of one run.
pub type BuildResult = Result<BuildSuccess>;

#[derive(Debug)]
pub struct BuildSuccess {
    pub stats: BuildStats,
    pub total_time: Duration,
    /// Stops the run, and for serving runs the live compilation behind it.
    pub cancel: CancelHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Serve,
    Build,
}

struct ActiveRun {
    id: u64,
    token: CancellationToken,
    /// Taken by whoever closes it first.
    compilation: Option<Arc<dyn DevCompilation>>,
    router: Option<PreviewRouter>,
    finished: watch::Receiver<bool>,
}

struct Inner {
    compiler: Arc<dyn Compiler>,
    state: watch::Sender<LifecycleState>,
    active: Mutex<Option<ActiveRun>>,
    next_id: AtomicU64,
    close_timeout: Duration,
}

/// Drives preview builds through a [`Compiler`].
#[derive(Clone)]
pub struct PreviewBuilder {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PreviewBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewBuilder")
            .field("state", &self.state())
            .field("close_timeout", &self.inner.close_timeout)
            .finish_non_exhaustive()
    }
}

impl PreviewBuilder {
    pub fn new(compiler: Arc<dyn Compiler>) -> Self {
        Self::with_close_timeout(compiler, DEFAULT_CLOSE_TIMEOUT)
    }

    pub fn with_close_timeout(compiler: Arc<dyn Compiler>, close_timeout: Duration) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            inner: Arc::new(Inner {
                compiler,
                state,
                active: Mutex::new(None),
                next_id: AtomicU64::new(1),
                close_timeout,
            }),
        }
    }

    /// Serve the preview. `request.serving` must be set.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, request: BuildRequest) -> Result<LifecycleHandle> {
        if request.serving.is_none() {
            return Err(BuildError::Config(
                "Serving the preview requires a router and an event channel".to_string(),
            ));
        }
        self.launch(request, Mode::Serve)
    }

    /// Build the preview once into `request.output_dir`.
    pub fn build(&self, request: BuildRequest) -> Result<LifecycleHandle> {
        self.launch(request, Mode::Build)
    }

    /// Stop the active run. A no-op when nothing runs; safe to call repeatedly.
    pub async fn cancel(&self) {
        self.inner.cancel(None).await;
    }

    /// Handle cancelling whichever run is active when it is used.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            inner: Arc::clone(&self.inner),
            run: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    fn launch(&self, request: BuildRequest, mode: Mode) -> Result<LifecycleHandle> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let scope = RunScope::new();
        let (finished_tx, finished_rx) = watch::channel(false);

        {
            let mut active = self.inner.active.lock();
            if active.is_some() {
                return Err(BuildError::AlreadyRunning);
            }
            *active = Some(ActiveRun {
                id,
                token: scope.token().clone(),
                compilation: None,
                router: request.serving.as_ref().map(|s| s.router.clone()),
                finished: finished_rx,
            });
            self.inner.state.send_replace(LifecycleState::ConfigResolving);
        }

        let (result_tx, result_rx) = oneshot::channel();
        let run = Run {
            id,
            inner: Arc::clone(&self.inner),
            scope,
        };
        tokio::spawn(async move {
            let result = match mode {
                Mode::Serve => run.serve(request).await,
                Mode::Build => run.build(request).await,
            };
            run.finish(mode, &result).await;
            let _ = finished_tx.send(true);
            // The caller may have dropped the handle.
            let _ = result_tx.send(result);
        });

        Ok(LifecycleHandle {
            result: result_rx,
            cancel: CancelHandle {
                inner: Arc::clone(&self.inner),
                run: Some(id),
            },
        })
    }
}

impl Inner {
    /// Publish `state` for a live run. Serialized with `cancel` through the
    /// slot lock, so `Cancelling` is never overwritten.
    fn set_state(&self, token: &CancellationToken, state: LifecycleState) {
        let _active = self.active.lock();
        if !token.is_cancelled() {
            tracing::debug!(?state, "Preview lifecycle");
            self.state.send_replace(state);
        }
    }

    /// Release the slot held by run `id`, if it still holds it.
    fn release(&self, id: u64) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|run| run.id == id) {
            if let Some(router) = active.take().and_then(|run| run.router) {
                router.reset();
            }
            self.state.send_replace(LifecycleState::Idle);
        }
    }

    fn take_compilation(&self, id: u64) -> Option<Arc<dyn DevCompilation>> {
        self.active
            .lock()
            .as_mut()
            .filter(|run| run.id == id)
            .and_then(|run| run.compilation.take())
    }

    async fn close_compilation(&self, compilation: Arc<dyn DevCompilation>) {
        match tokio::time::timeout(self.close_timeout, compilation.close()).await {
            Ok(Ok(())) => tracing::warn!("Force closed preview build"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Unable to close preview build!"),
            Err(_) => tracing::warn!(
                timeout_ms = self.close_timeout.as_millis() as u64,
                "Unable to close preview build!"
            ),
        }
    }

    /// Cancel run `target`, or the active run when `None`. A no-op when the
    /// targeted run no longer holds the slot.
    async fn cancel(&self, target: Option<u64>) {
        let (id, compilation, mut finished) = {
            let mut active = self.active.lock();
            let Some(run) = active.as_mut() else {
                return;
            };
            if target.is_some_and(|target| target != run.id) {
                return;
            }
            run.token.cancel();
            self.state.send_replace(LifecycleState::Cancelling);
            (run.id, run.compilation.take(), run.finished.clone())
        };

        if let Some(compilation) = compilation {
            self.close_compilation(compilation).await;
        }

        // A dropped sender means the task is gone as well.
        let _ = finished.wait_for(|finished| *finished).await;
        self.release(id);
    }
}

/// One run's view of the controller.
struct Run {
    id: u64,
    inner: Arc<Inner>,
    scope: RunScope,
}

impl Run {
    /// Race `future` against cancellation.
    async fn checkpoint<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.scope.token().cancelled() => Err(BuildError::Cancelled),
            result = future => result,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.scope.is_cancelled() {
            Err(BuildError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn enter(&self, state: LifecycleState) {
        self.inner.set_state(self.scope.token(), state);
    }

    fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            inner: Arc::clone(&self.inner),
            run: Some(self.id),
        }
    }

    async fn serve(&self, request: BuildRequest) -> BuildResult {
        let serving = request.serving.clone().ok_or_else(|| {
            BuildError::Invariant("serving run started without a serving context".to_string())
        })?;

        let (config, runtime_dir) = self.prepare(&request).await?;
        self.ensure_live()?;

        self.enter(LifecycleState::CompilerInvoked);
        serving.emit(PreviewEvent::BuildStarted);
        let compilation = self
            .checkpoint(
                self.inner
                    .compiler
                    .serve(config, Some(serving.channel.clone())),
            )
            .await?;
        self.store_compilation(Arc::clone(&compilation))?;
        self.ensure_live()?;

        serving.router.mount(preview_static_router(&runtime_dir));
        serving.router.mount(compilation.router());

        self.enter(LifecycleState::Serving);
        let stats = self.checkpoint(compilation.wait_until_valid()).await?;
        self.ensure_live()?;

        let Some(stats) = stats else {
            return Err(BuildError::Invariant("no stats after building preview".to_string()));
        };

        if stats.has_errors() {
            exit_code::mark_failure();
            let error = stats
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            serving.emit(PreviewEvent::BuildFailed { error });
            return Err(BuildError::Compile {
                errors: stats.errors,
            });
        }

        let total_time = request.start_time.elapsed();
        serving.emit(PreviewEvent::BuildCompleted {
            duration_ms: total_time.as_millis() as u64,
        });
        self.enter(LifecycleState::Resolved);

        Ok(BuildSuccess {
            stats,
            total_time,
            cancel: self.cancel_handle(),
        })
    }

    async fn build(&self, request: BuildRequest) -> BuildResult {
        tracing::info!("=> Compiling preview..");
        let (config, runtime_dir) = self.prepare(&request).await?;
        self.ensure_live()?;

        self.enter(LifecycleState::CompilerInvoked);
        let compile = self.inner.compiler.build(&config, &self.scope);
        let copy = copy_preview_runtime(&runtime_dir, &config.output_dir, &self.scope);

        let joined = self
            .checkpoint(async { tokio::try_join!(compile, copy) })
            .await;
        let (stats, copied) = match joined {
            Ok(joined) => joined,
            Err(BuildError::Cancelled) => return Err(BuildError::Cancelled),
            Err(e) => {
                tracing::error!("=> Failed to build the preview");
                tracing::error!("{}", e);
                exit_code::mark_failure();
                return Err(e);
            }
        };

        self.enter(LifecycleState::Finalizing);
        if stats.has_errors() {
            tracing::error!("=> Failed to build the preview");
            for error in &stats.errors {
                tracing::error!("{}", error);
            }
            exit_code::mark_failure();
            return Err(BuildError::Compile {
                errors: stats.errors,
            });
        }

        write_meta(&config.output_dir, &stats).await?;

        let total_time = request.start_time.elapsed();
        tracing::debug!(
            runtime_files = copied.files.len(),
            outputs = stats.metadata.outputs.len(),
            "=> Preview built in {}",
            print_duration(total_time)
        );
        self.enter(LifecycleState::Resolved);

        Ok(BuildSuccess {
            stats,
            total_time,
            cancel: self.cancel_handle(),
        })
    }

    /// Resolve presets, assemble the bundle configuration and locate the
    /// runtime shell.
    async fn prepare(&self, request: &BuildRequest) -> Result<(PreviewBundleConfig, PathBuf)> {
        let options = &request.options;
        let presets = self
            .checkpoint(resolve_presets(request.presets.as_ref(), options))
            .await?;

        let working_dir = options.working_dir()?;
        let output_dir = if request.output_dir.is_absolute() {
            request.output_dir.clone()
        } else {
            working_dir.join(&request.output_dir)
        };

        let config = iframe_config(options, &presets, &output_dir)?;
        let config = self
            .checkpoint(async {
                request
                    .presets
                    .bundler_final(options, config)
                    .await
                    .map_err(|e| BuildError::preset("bundler_final", e))
            })
            .await?;

        let runtime_dir = preview_runtime_dir(options.preview_runtime_dir.as_deref(), &working_dir)?;
        Ok((config, runtime_dir))
    }

    fn store_compilation(&self, compilation: Arc<dyn DevCompilation>) -> Result<()> {
        let mut active = self.inner.active.lock();
        match active.as_mut() {
            Some(run) if run.id == self.id => {
                run.compilation = Some(compilation);
                Ok(())
            }
            _ => Err(BuildError::Invariant(
                "preview run lost its slot while starting the compiler".to_string(),
            )),
        }
    }

    /// Settle the slot once the run body returned.
    async fn finish(&self, mode: Mode, result: &BuildResult) {
        let keep_serving = mode == Mode::Serve && result.is_ok();
        if keep_serving {
            return;
        }

        if let Some(compilation) = self.inner.take_compilation(self.id) {
            self.inner.close_compilation(compilation).await;
        }
        // File work abandoned by a dropped future still owns the output dir.
        self.scope.settle().await;
        if let Err(e) = result {
            if e.is_fatal() {
                tracing::debug!(error = %e, "Preview run failed");
            } else {
                tracing::debug!("Preview run cancelled");
            }
        }
        self.inner.release(self.id);
    }
}

async fn write_meta(output_dir: &Path, stats: &BuildStats) -> Result<()> {
    let meta = serde_json::to_vec(&stats.metadata)
        .map_err(|e| BuildError::Io(std::io::Error::other(e)))?;
    tokio::fs::create_dir_all(output_dir).await?;
    tokio::fs::write(output_dir.join(META_FILE), meta).await?;
    Ok(())
}

/// Cancels one run, or with [`PreviewBuilder::cancel_handle`] whichever run
/// is active. A handle for a finished run does nothing.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<Inner>,
    run: Option<u64>,
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

impl CancelHandle {
    pub async fn cancel(&self) {
        self.inner.cancel(self.run).await;
    }
}

/// Handle to a run. The run progresses whether or not this is awaited.
#[derive(Debug)]
pub struct LifecycleHandle {
    result: oneshot::Receiver<BuildResult>,
    cancel: CancelHandle,
}

impl LifecycleHandle {
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl IntoFuture for LifecycleHandle {
    type Output = BuildResult;
    type IntoFuture = Pin<Box<dyn Future<Output = BuildResult> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            self.result.await.unwrap_or_else(|_| {
                Err(BuildError::Invariant(
                    "preview run ended without a result".to_string(),
                ))
            })
        })
    }
}
