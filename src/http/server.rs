//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all render handler
//! - Wire up middleware (timeout, request ID, tracing)
//! - Cap request bodies at `max_body_bytes` while buffering them
//! - Convert HTTP requests into `PageRequest`s and render them
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::config::PipelineConfig;
use crate::http::request::{PageRequest, X_REQUEST_ID};
use crate::pipeline::App;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
    /// Origin used when a request carries no `Host` header.
    pub origin: String,
    pub max_body_bytes: usize,
}

/// HTTP bridge in front of an [`App`].
pub struct HttpServer {
    router: Router,
    config: Arc<PipelineConfig>,
}

impl HttpServer {
    pub fn new(app: Arc<App>, config: Arc<PipelineConfig>) -> Self {
        let state = AppState {
            app,
            origin: fallback_origin(&config),
            max_body_bytes: config.server.max_body_bytes,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &PipelineConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)));

        Router::new()
            .route("/{*path}", any(render_handler))
            .route("/", any(render_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// The router, for serving it elsewhere or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            base = %self.config.site.base,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Site URL origin if configured, else the bind address.
fn fallback_origin(config: &PipelineConfig) -> String {
    config
        .site
        .url
        .as_deref()
        .and_then(|u| Url::parse(u).ok())
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_else(|| format!("http://{}", config.server.bind_address))
}

/// Render every method and path through the pipeline.
async fn render_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let mut page_request = match PageRequest::from_parts(parts, body, &state.origin) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed request URL");
            return (StatusCode::BAD_REQUEST, "Malformed request URL").into_response();
        }
    };
    if let Some(addr) = client {
        page_request = page_request.with_client_address(addr);
    }

    match state.app.render(page_request).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
