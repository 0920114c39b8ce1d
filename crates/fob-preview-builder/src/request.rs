//! Inputs of a single preview run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use bon::Builder;
use fob_preview_config::PreviewOptions;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::presets::PresetHooks;

/// Everything one `start`/`build` call consumes. Moved into exactly one run.
#[derive(Builder)]
pub struct BuildRequest {
    #[builder(default = Instant::now())]
    pub start_time: Instant,
    pub options: PreviewOptions,
    pub presets: Arc<dyn PresetHooks>,
    #[builder(into)]
    pub output_dir: PathBuf,
    /// Present when serving.
    pub serving: Option<ServingContext>,
}

impl std::fmt::Debug for BuildRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildRequest")
            .field("start_time", &self.start_time)
            .field("options", &self.options)
            .field("output_dir", &self.output_dir)
            .field("serving", &self.serving.is_some())
            .finish_non_exhaustive()
    }
}

/// The host server pieces a serving run plugs into.
#[derive(Debug, Clone)]
pub struct ServingContext {
    pub router: PreviewRouter,
    pub channel: broadcast::Sender<PreviewEvent>,
}

impl ServingContext {
    pub fn new(router: PreviewRouter, capacity: usize) -> (Self, broadcast::Receiver<PreviewEvent>) {
        let (channel, receiver) = broadcast::channel(capacity);
        (Self { router, channel }, receiver)
    }

    /// Best effort: nobody listening is fine.
    pub fn emit(&self, event: PreviewEvent) {
        let _ = self.channel.send(event);
    }
}

/// Progress notifications of a serving run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreviewEvent {
    BuildStarted,
    BuildCompleted { duration_ms: u64 },
    BuildFailed { error: String },
}

/// A router shared with the host server. Routes mounted here show up in
/// every later call to [`PreviewRouter::service`].
#[derive(Debug, Clone, Default)]
pub struct PreviewRouter {
    inner: Arc<Mutex<Router>>,
}

impl PreviewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `routes` into the shared router.
    pub fn mount(&self, routes: Router) {
        let mut router = self.inner.lock();
        let current = std::mem::take(&mut *router);
        *router = current.merge(routes);
    }

    /// Snapshot of everything mounted so far.
    pub fn service(&self) -> Router {
        self.inner.lock().clone()
    }

    /// Drop every mounted route.
    pub fn reset(&self) {
        *self.inner.lock() = Router::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn mounted_routes_are_served() {
        let router = PreviewRouter::new();
        router.mount(Router::new().route("/a", get(|| async { "a" })));
        router.mount(Router::new().route("/b", get(|| async { "b" })));

        for path in ["/a", "/b"] {
            let response = router
                .service()
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        router.reset();
        let response = router
            .service()
            .oneshot(Request::builder().uri("/a").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let json = serde_json::to_string(&PreviewEvent::BuildCompleted { duration_ms: 12 }).unwrap();
        assert_eq!(json, r#"{"type":"build_completed","duration_ms":12}"#);
    }
}
