//! Lifecycle controller behaviour against fake compilers.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use fob_preview_builder::{
    BuildError, BuildRequest, LifecycleState, PresetHooks, PreviewBuilder, PreviewEvent,
    PreviewRouter, ServingContext, exit_code,
};
use fob_preview_config::{CoreConfig, PreviewOptions};
use helpers::{
    Behavior, FakeCompilation, FakeCompiler, Project, SLOW_WRITE_INTERVAL, is_cancelled, two_errors,
};
use tokio::sync::Notify;
use tokio::time::timeout;
use tower::ServiceExt;

const LIMIT: Duration = Duration::from_secs(10);

fn request(project: &Project) -> BuildRequest {
    BuildRequest::builder()
        .options(project.options.clone())
        .presets(project.presets.clone())
        .output_dir(project.out_dir())
        .build()
}

fn serving_request(
    project: &Project,
) -> (BuildRequest, PreviewRouter, tokio::sync::broadcast::Receiver<PreviewEvent>) {
    let router = PreviewRouter::new();
    let (serving, events) = ServingContext::new(router.clone(), 16);
    let request = BuildRequest::builder()
        .options(project.options.clone())
        .presets(project.presets.clone())
        .output_dir(project.out_dir())
        .serving(serving)
        .build();
    (request, router, events)
}

async fn wait_for_state(builder: &PreviewBuilder, state: LifecycleState) {
    let mut states = builder.subscribe();
    timeout(LIMIT, states.wait_for(|s| *s == state))
        .await
        .expect("state reached in time")
        .unwrap();
}

#[tokio::test]
async fn disabled_story_store_fails_before_compiling() {
    let mut project = Project::new();
    project.options.features.story_store_v7 = false;
    let compiler = FakeCompiler::new(Behavior::Succeed);
    let builder = PreviewBuilder::new(compiler.clone());

    let err = builder.build(request(&project)).unwrap().await.unwrap_err();

    assert!(matches!(err, BuildError::Config(_)));
    assert!(err.to_string().contains("storyStoreV7"));
    assert_eq!(compiler.calls(), 0);
    assert_eq!(builder.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn compiler_errors_are_returned_and_flag_the_process() {
    let project = Project::new();
    let builder = PreviewBuilder::new(FakeCompiler::new(Behavior::Fail(two_errors())));

    let err = builder.build(request(&project)).unwrap().await.unwrap_err();

    assert_eq!(err.compile_errors(), two_errors().as_slice());
    assert_eq!(exit_code::current(), 1);
    assert!(!project.out_dir().join("meta.json").exists());
    assert_eq!(builder.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn one_shot_build_writes_metadata_and_runtime_shell() {
    let project = Project::new();
    let compiler = FakeCompiler::new(Behavior::Succeed);
    let builder = PreviewBuilder::new(compiler.clone());

    let success = builder.build(request(&project)).unwrap().await.unwrap();

    assert!(!success.stats.has_errors());
    assert_eq!(compiler.calls(), 1);
    let out = project.out_dir();
    assert!(out.join("meta.json").is_file());
    assert!(out.join("sb-preview/nested/runtime.mjs").is_file());
    assert!(!out.join("sb-preview/LICENSE").exists());
    assert_eq!(builder.state(), LifecycleState::Idle);

    // The slot is free again.
    builder.build(request(&project)).unwrap().await.unwrap();
}

#[tokio::test]
async fn second_run_is_rejected_while_one_is_active() {
    let project = Project::new();
    let builder = PreviewBuilder::new(FakeCompiler::new(Behavior::Hang));

    let first = builder.build(request(&project)).unwrap();
    let second = builder.build(request(&project));
    assert!(matches!(second, Err(BuildError::AlreadyRunning)));

    builder.cancel().await;
    assert!(is_cancelled(&first.await));
}

#[tokio::test]
async fn cancel_without_a_run_is_a_no_op() {
    let builder = PreviewBuilder::new(FakeCompiler::new(Behavior::Succeed));

    timeout(LIMIT, builder.cancel()).await.unwrap();
    timeout(LIMIT, builder.cancel()).await.unwrap();
    assert_eq!(builder.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn cancel_twice_during_compilation() {
    let project = Project::new();
    let compiler = FakeCompiler::new(Behavior::Hang);
    let builder = PreviewBuilder::new(compiler.clone());

    let handle = builder.build(request(&project)).unwrap();
    timeout(LIMIT, compiler.entered.notified()).await.unwrap();
    assert_eq!(builder.state(), LifecycleState::CompilerInvoked);

    timeout(LIMIT, builder.cancel()).await.unwrap();
    timeout(LIMIT, builder.cancel()).await.unwrap();

    assert!(is_cancelled(&handle.await));
    assert_eq!(builder.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn cancel_handle_of_a_finished_run_leaves_the_next_run_alone() {
    let project = Project::new();
    let compiler = FakeCompiler::new(Behavior::HangAfter(1));
    let builder = PreviewBuilder::new(compiler.clone());

    let first = builder.build(request(&project)).unwrap().await.unwrap();
    let second = builder.build(request(&project)).unwrap();
    wait_for_state(&builder, LifecycleState::CompilerInvoked).await;

    timeout(LIMIT, first.cancel.cancel()).await.unwrap();
    assert_eq!(builder.state(), LifecycleState::CompilerInvoked);
    assert!(matches!(
        builder.build(request(&project)),
        Err(BuildError::AlreadyRunning)
    ));

    timeout(LIMIT, second.cancel_handle().cancel()).await.unwrap();
    assert!(is_cancelled(&second.await));
    assert_eq!(compiler.calls(), 2);
    assert_eq!(builder.state(), LifecycleState::Idle);
}

fn file_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn cancelled_build_writes_nothing_after_cancel_returns() {
    let project = Project::new();
    let compiler = FakeCompiler::new(Behavior::WriteSlowly(50));
    let builder = PreviewBuilder::new(compiler.clone());
    let slow = project.out_dir().join("slow");

    let handle = builder.build(request(&project)).unwrap();
    timeout(LIMIT, compiler.entered.notified()).await.unwrap();
    tokio::time::sleep(SLOW_WRITE_INTERVAL * 3).await;

    timeout(LIMIT, builder.cancel()).await.unwrap();
    let written = file_count(&slow);
    tokio::time::sleep(SLOW_WRITE_INTERVAL * 5).await;

    assert_eq!(file_count(&slow), written);
    assert!(written < 50);
    assert!(is_cancelled(&handle.await));
    assert!(!project.out_dir().join("meta.json").exists());
    assert_eq!(builder.state(), LifecycleState::Idle);
}

/// Presets whose `core` hook never returns.
struct SlowPresets {
    entered: Arc<Notify>,
}

#[async_trait]
impl PresetHooks for SlowPresets {
    async fn core(&self, _options: &PreviewOptions) -> anyhow::Result<CoreConfig> {
        self.entered.notify_one();
        std::future::pending().await
    }
}

#[tokio::test]
async fn cancel_during_config_resolution() {
    let project = Project::new();
    let compiler = FakeCompiler::new(Behavior::Succeed);
    let builder = PreviewBuilder::new(compiler.clone());
    let entered = Arc::new(Notify::new());

    let handle = builder
        .build(
            BuildRequest::builder()
                .options(project.options.clone())
                .presets(Arc::new(SlowPresets {
                    entered: entered.clone(),
                }))
                .output_dir(project.out_dir())
                .build(),
        )
        .unwrap();
    assert_eq!(builder.state(), LifecycleState::ConfigResolving);
    timeout(LIMIT, entered.notified()).await.unwrap();

    timeout(LIMIT, builder.cancel()).await.unwrap();

    assert!(is_cancelled(&handle.await));
    assert_eq!(compiler.calls(), 0);
    assert_eq!(builder.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn cancel_before_the_run_first_suspends() {
    let project = Project::new();
    let compiler = FakeCompiler::new(Behavior::Succeed);
    let builder = PreviewBuilder::new(compiler.clone());

    let handle = builder.build(request(&project)).unwrap();
    let cancel = handle.cancel_handle();
    timeout(LIMIT, cancel.cancel()).await.unwrap();

    // Either the signal won, or the run had already resolved.
    let result = handle.await;
    assert!(is_cancelled(&result) || result.is_ok());
    assert_eq!(builder.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn cancel_while_waiting_for_a_valid_build_closes_the_compilation() {
    let project = Project::new();
    let compiler = FakeCompiler::with_compilation(Behavior::Succeed, FakeCompilation::hanging());
    let builder = PreviewBuilder::new(compiler.clone());
    let (request, _router, _events) = serving_request(&project);

    let handle = builder.start(request).unwrap();
    wait_for_state(&builder, LifecycleState::Serving).await;

    timeout(LIMIT, builder.cancel()).await.unwrap();

    assert!(is_cancelled(&handle.await));
    assert!(compiler.compilation.is_closed());
    assert_eq!(builder.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn serving_run_stays_resolved_until_cancelled() {
    let project = Project::new();
    let compiler = FakeCompiler::new(Behavior::Succeed);
    let builder = PreviewBuilder::new(compiler.clone());
    let (serving, router, mut events) = serving_request(&project);

    let success = builder.start(serving).unwrap().await.unwrap();
    assert_eq!(builder.state(), LifecycleState::Resolved);
    assert_eq!(events.recv().await.unwrap(), PreviewEvent::BuildStarted);
    assert!(matches!(
        events.recv().await.unwrap(),
        PreviewEvent::BuildCompleted { .. }
    ));

    let shell = router
        .service()
        .oneshot(
            Request::builder()
                .uri("/sb-preview/nested/runtime.mjs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(shell.status(), StatusCode::OK);
    assert_eq!(
        shell.headers()[header::CACHE_CONTROL],
        "public, max-age=300, immutable"
    );

    let page = router
        .service()
        .oneshot(Request::builder().uri("/iframe.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::OK);

    // The slot is held by the live compilation.
    assert!(matches!(
        builder.build(request(&project)),
        Err(BuildError::AlreadyRunning)
    ));

    timeout(LIMIT, success.cancel.cancel()).await.unwrap();
    assert!(compiler.compilation.is_closed());
    assert_eq!(builder.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn serving_without_stats_is_an_invariant_violation() {
    let project = Project::new();
    let compiler = FakeCompiler::with_compilation(Behavior::Succeed, FakeCompilation::without_stats());
    let builder = PreviewBuilder::new(compiler.clone());
    let (request, _router, _events) = serving_request(&project);

    let err = builder.start(request).unwrap().await.unwrap_err();

    assert!(matches!(err, BuildError::Invariant(ref m) if m == "no stats after building preview"));
    assert!(err.is_fatal());
    assert!(compiler.compilation.is_closed());
    assert_eq!(builder.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn a_compilation_that_never_closes_does_not_block_cancel() {
    let project = Project::new();
    let compilation = FakeCompilation {
        hang_on_close: true,
        ..FakeCompilation::ready()
    };
    let compiler = FakeCompiler::with_compilation(Behavior::Succeed, compilation);
    let builder = PreviewBuilder::with_close_timeout(compiler.clone(), Duration::from_millis(50));
    let (request, _router, _events) = serving_request(&project);

    let success = builder.start(request).unwrap().await.unwrap();
    timeout(LIMIT, success.cancel.cancel()).await.unwrap();

    assert!(!compiler.compilation.is_closed());
    assert_eq!(builder.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn start_requires_a_serving_context() {
    let project = Project::new();
    let builder = PreviewBuilder::new(FakeCompiler::new(Behavior::Succeed));

    let err = builder.start(request(&project)).unwrap_err();
    assert!(matches!(err, BuildError::Config(_)));
    assert_eq!(builder.state(), LifecycleState::Idle);
}
