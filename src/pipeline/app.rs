//! Request-to-response orchestration.
//!
//! # Render states
//! ```text
//! resolve      no route, or outside base      → 404 page
//! load         not-found error                → 404 page
//!              any other error (logged)       → 500 page
//! context      NoMatchingStaticPathFound      → 404 page
//!              any other error                → 500 page
//! chain        middleware → page, head elements computed alongside
//!              error                          → 500 page
//! finish       status override, cookies, head merged into HTML
//!              empty 404/500 body             → matching error page
//! ```
//!
//! Errors raised while rendering an error page are returned to the caller.

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::http::{PageRequest, PageResponse};
use crate::middleware::run_chain;
use crate::observability::metrics;
use crate::pipeline::{Generation, Pipeline, RewritePayload, RewriteTarget};
use crate::render::RenderContext;
use crate::routing::RouteData;

/// Outcome of route resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub route: Arc<RouteData>,
    pub status: StatusCode,
}

/// Renders requests through a pipeline.
#[derive(Clone)]
pub struct App {
    pipeline: Arc<dyn Pipeline>,
}

impl App {
    pub fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    /// Match `url` against the generation's table. Unmatched URLs resolve
    /// to the 404 route; this never fails.
    pub fn resolve(&self, generation: &Generation, url: &Url) -> Resolved {
        let table = generation.table();
        let matched = self
            .pipeline
            .core()
            .strip_base(url.path())
            .and_then(|path| table.match_path(path));

        match matched {
            Some(route) => {
                let status = if route.is_404() {
                    StatusCode::NOT_FOUND
                } else if route.is_500() {
                    StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    StatusCode::OK
                };
                Resolved { route, status }
            }
            None => {
                tracing::info!(path = %url.path(), "No route matched");
                Resolved {
                    route: table.not_found_route(),
                    status: StatusCode::NOT_FOUND,
                }
            }
        }
    }

    /// Resolve a rewrite against the live generation.
    pub async fn rewrite(
        &self,
        payload: impl Into<RewritePayload>,
        request: &PageRequest,
        source: &RouteData,
    ) -> Result<RewriteTarget> {
        let generation = self.pipeline.core().generation();
        self.pipeline
            .try_rewrite(&generation, &payload.into(), request, source)
            .await
    }

    /// Render one request.
    pub async fn render(&self, request: PageRequest) -> Result<PageResponse> {
        let start = Instant::now();
        // Requests that did not come through the HTTP layer get an id here.
        let request_id = request
            .request_id()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = tracing::info_span!(
            "render",
            method = %request.method(),
            path = %request.url().path(),
            request_id = %request_id,
        );

        let result = self.render_request(Arc::new(request)).instrument(span).await;
        match &result {
            Ok(response) => metrics::record_render(response.status().as_u16(), start),
            Err(err) => tracing::error!(error = %err, kind = err.name(), "Error page failed to render"),
        }
        result
    }

    async fn render_request(&self, request: Arc<PageRequest>) -> Result<PageResponse> {
        let generation = self.pipeline.core().generation();
        let resolved = self.resolve(&generation, request.url());

        let component = match self
            .pipeline
            .get_component_by_route(&generation, &resolved.route)
            .await
        {
            Ok(component) => component,
            Err(err) if err.is_not_found() && !resolved.route.is_404() => {
                return self.render_error(&generation, &request, StatusCode::NOT_FOUND, None).await;
            }
            Err(err) => return self.fail(&generation, &request, err).await,
        };

        let target = RewriteTarget {
            route: resolved.route.clone(),
            component,
            url: request.url().clone(),
        };
        let mut ctx = match RenderContext::create(
            self.pipeline.clone(),
            generation.clone(),
            request.clone(),
            target,
        )
        .await
        {
            Ok(ctx) => ctx,
            Err(err) if err.is_not_found() => {
                tracing::info!(error = %err, "No static path for request");
                return self.render_error(&generation, &request, StatusCode::NOT_FOUND, None).await;
            }
            Err(err) => return self.fail(&generation, &request, err).await,
        };
        if resolved.status != StatusCode::OK {
            ctx.set_status(resolved.status);
        }

        let response = match self.run(&mut ctx).await {
            Ok(response) => response,
            Err(err) => return self.fail(&generation, &request, err).await,
        };

        let status = response.status();
        let is_error_route = match status {
            StatusCode::NOT_FOUND => ctx.route().is_404(),
            _ => ctx.route().is_500(),
        };
        if response.is_reroutable() && !is_error_route {
            return self.render_error(&generation, &request, status, None).await;
        }
        Ok(response)
    }

    /// Middleware chain and page, with head elements computed concurrently.
    async fn run(&self, ctx: &mut RenderContext) -> Result<PageResponse> {
        let route = ctx.route().clone();
        let generation = ctx.generation().clone();
        ctx.set_component_metadata(self.pipeline.component_metadata(&route).await?);

        let middleware = self.pipeline.core().middleware();
        let (head, response) = futures_util::join!(
            self.pipeline.head_elements(&generation, &route),
            run_chain(middleware, &mut *ctx),
        );
        let response = response?;

        // A middleware rewrite changes the route the head belongs to.
        let head = if Arc::ptr_eq(ctx.route(), &route) {
            head?
        } else {
            self.pipeline.head_elements(&generation, ctx.route()).await?
        };
        Ok(ctx.finalize(response, &head))
    }

    async fn fail(
        &self,
        generation: &Arc<Generation>,
        request: &Arc<PageRequest>,
        err: PipelineError,
    ) -> Result<PageResponse> {
        tracing::error!(error = %err, kind = err.name(), "Render failed");
        self.render_error(generation, request, StatusCode::INTERNAL_SERVER_ERROR, Some(err))
            .await
    }

    /// Render the custom or built-in error page for `status`, without
    /// user middleware.
    async fn render_error(
        &self,
        generation: &Arc<Generation>,
        request: &Arc<PageRequest>,
        status: StatusCode,
        error: Option<PipelineError>,
    ) -> Result<PageResponse> {
        let table = generation.table();
        let route = if status == StatusCode::NOT_FOUND {
            table.not_found_route()
        } else {
            table.server_error_route()
        };

        let component = self.pipeline.get_component_by_route(generation, &route).await?;
        let target = RewriteTarget {
            route: route.clone(),
            component,
            url: request.url().clone(),
        };
        let mut ctx = RenderContext::create(
            self.pipeline.clone(),
            generation.clone(),
            request.clone(),
            target,
        )
        .await?;
        ctx.set_status(status);
        ctx.set_error(error.map(Arc::new));

        let head = self.pipeline.head_elements(generation, &route).await?;
        let response = ctx.render_page().await?;
        Ok(ctx.finalize(response, &head))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, RuntimeMode};
    use crate::loader::{ComponentInstance, Page};
    use crate::middleware::{Middleware, Next};
    use crate::pipeline::ContainerPipeline;
    use async_trait::async_trait;

    fn container() -> Arc<ContainerPipeline> {
        Arc::new(ContainerPipeline::new(
            Arc::new(PipelineConfig::default()),
            RuntimeMode::Development,
        ))
    }

    async fn get(app: &App, path: &str) -> PageResponse {
        let request = PageRequest::get(&format!("http://localhost{path}")).unwrap();
        app.render(request).await.unwrap()
    }

    struct Failing;

    #[async_trait]
    impl Page for Failing {
        async fn render(&self, _ctx: &mut RenderContext) -> Result<PageResponse> {
            Err(PipelineError::render("boom"))
        }
    }

    struct Empty(StatusCode);

    #[async_trait]
    impl Page for Empty {
        async fn render(&self, _ctx: &mut RenderContext) -> Result<PageResponse> {
            Ok(PageResponse::status_only(self.0))
        }
    }

    #[tokio::test]
    async fn test_unmatched_renders_builtin_404() {
        let pipeline = container();
        pipeline.insert_route("/", ComponentInstance::html("<p>home</p>"));
        let app = App::new(pipeline);

        let response = get(&app, "/missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.body_text().contains("404: Not Found"));
    }

    #[tokio::test]
    async fn test_custom_404_keeps_status() {
        let pipeline = container();
        pipeline.insert_route("/404", ComponentInstance::html("<p>custom</p>"));
        let app = App::new(pipeline);

        let response = get(&app, "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "<p>custom</p>");
    }

    #[tokio::test]
    async fn test_page_error_renders_500() {
        let pipeline = container();
        pipeline.insert_route("/broken", ComponentInstance::new(Failing));
        let app = App::new(pipeline);

        let response = get(&app, "/broken").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body_text().contains("RenderError"));
    }

    #[tokio::test]
    async fn test_empty_404_is_rerouted() {
        let pipeline = container();
        pipeline.insert_route("/gone", ComponentInstance::new(Empty(StatusCode::NOT_FOUND)));
        pipeline.insert_route("/404", ComponentInstance::html("<p>lost</p>"));
        let app = App::new(pipeline);

        let response = get(&app, "/gone").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "<p>lost</p>");
    }

    #[tokio::test]
    async fn test_failing_500_page_propagates() {
        let pipeline = container();
        pipeline.insert_route("/broken", ComponentInstance::new(Failing));
        pipeline.insert_route("/500", ComponentInstance::new(Failing));
        let app = App::new(pipeline);

        let request = PageRequest::get("http://localhost/broken").unwrap();
        assert!(app.render(request).await.is_err());
    }

    struct Silent;

    #[async_trait]
    impl Middleware for Silent {
        async fn handle(&self, _ctx: &mut RenderContext, _next: Next<'_>) -> Result<Option<PageResponse>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_middleware_without_response_or_next() {
        let pipeline = ContainerPipeline::new(Arc::new(PipelineConfig::default()), RuntimeMode::Development)
            .with_middleware(vec![Arc::new(Silent)]);
        pipeline.insert_route("/", ComponentInstance::html("<p>home</p>"));
        let app = App::new(Arc::new(pipeline));

        let response = get(&app, "/").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body_text().contains("MiddlewareNoDataOrNextCalled"));
    }

    #[tokio::test]
    async fn test_resolve_outside_base() {
        let config = PipelineConfig {
            site: crate::config::SiteConfig {
                base: "/docs".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let pipeline = Arc::new(ContainerPipeline::new(Arc::new(config), RuntimeMode::Production));
        pipeline.insert_route("/", ComponentInstance::html("docs home"));
        let app = App::new(pipeline.clone());
        let generation = pipeline.core().generation();

        let inside = app.resolve(&generation, &Url::parse("http://x/docs/").unwrap());
        assert_eq!(inside.route.route, "/");
        assert_eq!(inside.status, StatusCode::OK);

        let outside = app.resolve(&generation, &Url::parse("http://x/").unwrap());
        assert!(outside.route.is_404());
        assert_eq!(outside.status, StatusCode::NOT_FOUND);
    }
}
