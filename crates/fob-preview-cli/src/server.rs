//! HTTP host for the development preview.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::Request;
use fob_preview_builder::PreviewRouter;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::error::{CliError, Result};

/// Routes every request through whatever `preview` has mounted at the time
/// it arrives, so routes added after the server started are served too.
pub fn app(preview: PreviewRouter) -> Router {
    Router::new().fallback(move |request: Request| {
        let preview = preview.clone();
        async move { preview.service().oneshot(request).await }
    })
}

/// Bind `addr`. Port 0 picks a free port; the bound address is returned.
pub async fn bind(addr: SocketAddr) -> Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))?;
    let local = listener.local_addr()?;
    Ok((listener, local))
}

/// Serve `preview` until `shutdown` fires.
pub async fn serve(listener: TcpListener, preview: PreviewRouter, shutdown: CancellationToken) -> Result<()> {
    axum::serve(listener, app(preview))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| CliError::Server(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;

    fn get_request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn routes_mounted_after_startup_are_served() {
        let preview = PreviewRouter::new();
        let app = app(preview.clone());

        let before = app.clone().oneshot(get_request("/iframe.html")).await.unwrap();
        assert_eq!(before.status(), StatusCode::NOT_FOUND);

        preview.mount(Router::new().route("/iframe.html", get(|| async { "<html></html>" })));
        let after = app.oneshot(get_request("/iframe.html")).await.unwrap();
        assert_eq!(after.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let (_listener, addr) = bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
        assert_ne!(addr.port(), 0);
    }
}
