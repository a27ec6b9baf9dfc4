//! Health-check listener (axum).
//!
//! This crate implements the `jirabot-core` HealthListener port: a single
//! endpoint the load balancer polls to decide whether the process is alive.

use std::{
    any::Any,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::{net::TcpListener, sync::OnceCell};
use tokio_util::sync::CancellationToken;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use jirabot_core::{errors::Error, ports::HealthListener, Result};

pub const HEALTH_PATH: &str = "/jirabot";
pub const HEALTH_PORT: u16 = 8080;

pub struct HealthServer {
    addr: SocketAddr,
    path: Arc<str>,
    shutdown: CancellationToken,
    local_addr: OnceCell<SocketAddr>,
}

impl HealthServer {
    pub fn new(addr: SocketAddr, path: impl Into<Arc<str>>) -> Self {
        Self {
            addr,
            path: path.into(),
            shutdown: CancellationToken::new(),
            local_addr: OnceCell::new(),
        }
    }

    /// The production listener: `0.0.0.0:8080`, serving `/jirabot`.
    pub fn load_balancer() -> Self {
        Self::new((Ipv4Addr::UNSPECIFIED, HEALTH_PORT).into(), HEALTH_PATH)
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Stop serving. The socket is released once in-flight requests finish.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Bind the socket and serve in a background task.
    ///
    /// Only the first call binds; later or concurrent calls get the same address.
    pub async fn bind(&self) -> Result<SocketAddr> {
        self.local_addr
            .get_or_try_init(|| self.serve())
            .await
            .copied()
    }

    async fn serve(&self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| Error::Health(format!("failed to bind {}: {e}", self.addr)))?;
        let local = listener.local_addr()?;

        let app = router(self.path.clone());
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                tracing::error!(error = %e, "health-check listener stopped");
            }
        });

        tracing::info!(address = %local, path = %self.path, "health-check listening");
        Ok(local)
    }
}

#[async_trait]
impl HealthListener for HealthServer {
    async fn start(&self) -> Result<()> {
        self.bind().await.map(|_| ())
    }
}

/// Router answering `200 ok` on the health path and `404 not found` elsewhere.
pub fn router(path: Arc<str>) -> Router {
    with_error_boundary(Router::new().fallback(respond).with_state(path))
}

/// Wrap per-request handling so a panic never reaches the listener.
fn with_error_boundary(app: Router) -> Router {
    app.layer(CatchPanicLayer::custom(on_panic))
        .layer(TraceLayer::new_for_http())
}

async fn respond(State(path): State<Arc<str>>, uri: Uri) -> Response {
    // The full request target has to match, query string included.
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("");
    if target == &*path {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::NOT_FOUND, "not found").into_response()
    }
}

fn on_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "health-check handler panicked");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
