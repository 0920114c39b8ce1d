//! Shared fixtures and fake compilers for the lifecycle tests.

#![allow(dead_code)]

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::routing::get;
use fob_preview_builder::{
    BuildError, BuildStats, Compiler, DevCompilation, ExtractedDiagnostic, PreviewBundleConfig,
    PreviewEvent, Result, RunScope,
};
use fob_preview_config::{PresetConfig, PreviewOptions, StoriesEntry};
use tempfile::TempDir;
use tokio::sync::{Notify, broadcast};

/// A project with one story file, a preview file and a runtime shell.
pub struct Project {
    pub dir: TempDir,
    pub options: PreviewOptions,
    pub presets: Arc<PresetConfig>,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".storybook")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("shell/nested")).unwrap();
        fs::write(root.join(".storybook/preview.js"), "export const parameters = {};\n").unwrap();
        fs::write(
            root.join("src/Button.stories.js"),
            "export default { title: 'Button' };\nexport const Primary = () => 'button';\n",
        )
        .unwrap();
        fs::write(root.join("shell/nested/runtime.mjs"), "export {};\n").unwrap();
        fs::write(root.join("shell/LICENSE"), "MIT\n").unwrap();

        let options = PreviewOptions {
            cwd: Some(root.to_path_buf()),
            preview_runtime_dir: Some(root.join("shell")),
            ..PreviewOptions::default()
        };
        let presets = Arc::new(PresetConfig {
            stories: vec![StoriesEntry::Pattern("../src/*.stories.js".into())],
            ..PresetConfig::default()
        });

        Self { dir, options, presets }
    }

    pub fn out_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("storybook-static")
    }
}

/// What the fake does once invoked.
#[derive(Clone)]
pub enum Behavior {
    Succeed,
    Fail(Vec<ExtractedDiagnostic>),
    /// Never finishes.
    Hang,
    /// Succeeds this many times, then hangs.
    HangAfter(usize),
    /// Writes this many files into `<output>/slow` on the blocking pool,
    /// one every [`SLOW_WRITE_INTERVAL`], stopping once the run is cancelled.
    WriteSlowly(usize),
}

pub const SLOW_WRITE_INTERVAL: Duration = Duration::from_millis(20);

/// Records invocations and answers according to its [`Behavior`].
pub struct FakeCompiler {
    pub behavior: Behavior,
    pub calls: AtomicUsize,
    pub entered: Arc<Notify>,
    pub compilation: Arc<FakeCompilation>,
}

impl FakeCompiler {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Self::with_compilation(behavior, FakeCompilation::ready())
    }

    pub fn with_compilation(behavior: Behavior, compilation: FakeCompilation) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            entered: Arc::new(Notify::new()),
            compilation: Arc::new(compilation),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Compiler for FakeCompiler {
    async fn build(&self, config: &PreviewBundleConfig, scope: &RunScope) -> Result<BuildStats> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        match &self.behavior {
            Behavior::Succeed => Ok(BuildStats::default()),
            Behavior::HangAfter(n) if previous < *n => Ok(BuildStats::default()),
            Behavior::Fail(errors) => Ok(BuildStats::failed(errors.clone())),
            Behavior::Hang | Behavior::HangAfter(_) => std::future::pending().await,
            Behavior::WriteSlowly(count) => {
                let (dir, count) = (config.output_dir.join("slow"), *count);
                scope
                    .spawn_blocking(move |token| {
                        fs::create_dir_all(&dir)?;
                        for i in 0..count {
                            if token.is_cancelled() {
                                return Err(BuildError::Cancelled);
                            }
                            std::thread::sleep(SLOW_WRITE_INTERVAL);
                            fs::write(dir.join(format!("{}.js", i)), "")?;
                        }
                        Ok(())
                    })
                    .await?;
                Ok(BuildStats::default())
            }
        }
    }

    async fn serve(
        &self,
        _config: PreviewBundleConfig,
        _events: Option<broadcast::Sender<PreviewEvent>>,
    ) -> Result<Arc<dyn DevCompilation>> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        let hang = match self.behavior {
            Behavior::Hang => true,
            Behavior::HangAfter(n) => previous >= n,
            _ => false,
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(Arc::clone(&self.compilation) as Arc<dyn DevCompilation>)
    }
}

/// A live compilation whose first build result is fixed up front.
pub struct FakeCompilation {
    pub stats: Option<BuildStats>,
    pub hang: bool,
    pub hang_on_close: bool,
    pub closed: AtomicBool,
}

impl FakeCompilation {
    pub fn ready() -> Self {
        Self {
            stats: Some(BuildStats::default()),
            hang: false,
            hang_on_close: false,
            closed: AtomicBool::new(false),
        }
    }

    pub fn without_stats() -> Self {
        Self {
            stats: None,
            ..Self::ready()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::ready()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DevCompilation for FakeCompilation {
    fn router(&self) -> Router {
        Router::new().route("/iframe.html", get(|| async { "<html></html>" }))
    }

    async fn wait_until_valid(&self) -> Result<Option<BuildStats>> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(self.stats.clone())
    }

    async fn close(&self) -> anyhow::Result<()> {
        if self.hang_on_close {
            std::future::pending::<()>().await;
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub fn two_errors() -> Vec<ExtractedDiagnostic> {
    vec![
        ExtractedDiagnostic::error("Unexpected token").with_file("src/Button.stories.js"),
        ExtractedDiagnostic::error("Could not resolve './missing'").with_file("src/Card.stories.js"),
    ]
}

pub fn is_cancelled<T>(result: &std::result::Result<T, BuildError>) -> bool {
    matches!(result, Err(BuildError::Cancelled))
}
