//! Per-render state handed to middleware and pages.
//!
//! # Responsibilities
//! - Expose the matched route, params, props and request to page code
//! - Hold the render-scoped status override, cookies and current locale
//! - Perform rewrites, either page-level (render another route now) or
//!   middleware-level (retarget this context and continue the chain)
//!
//! # Design Decisions
//! - A context is built per resolved target; a rewrite builds a new one
//!   that shares only the original request (and so its locals)
//! - A context keeps the route generation it started with, so a route
//!   table swap never changes what an in-flight render sees

use std::sync::Arc;

use axum::http::{header, StatusCode};
use url::Url;

use crate::error::{PipelineError, Result};
use crate::http::{Locals, PageRequest, PageResponse};
use crate::loader::{ComponentInstance, ComponentMetadata};
use crate::pipeline::{Generation, Pipeline, RewritePayload, RewriteTarget};
use crate::render::cookies::Cookies;
use crate::render::head::HeadElements;
use crate::render::params::{get_props, Props};
use crate::routing::{Params, RouteData};

pub struct RenderContext {
    pipeline: Arc<dyn Pipeline>,
    generation: Arc<Generation>,
    request: Arc<PageRequest>,
    route: Arc<RouteData>,
    component: Arc<ComponentInstance>,
    url: Url,
    pathname: String,
    params: Params,
    props: Props,
    status: Option<StatusCode>,
    cookies: Cookies,
    error: Option<Arc<PipelineError>>,
    current_locale: Option<String>,
    component_metadata: Option<ComponentMetadata>,
}

impl RenderContext {
    /// Build a context for `route` rendered at `url`. Fails when props
    /// cannot be derived for the pathname.
    pub async fn create(
        pipeline: Arc<dyn Pipeline>,
        generation: Arc<Generation>,
        request: Arc<PageRequest>,
        target: RewriteTarget,
    ) -> Result<Self> {
        let RewriteTarget { route, component, url } = target;
        let pathname = pipeline.core().pathname(&url);
        let params = if route.is_dynamic() {
            route.params(&pathname).unwrap_or_default()
        } else {
            Params::new()
        };
        let props = get_props(
            &route,
            &component,
            &pathname,
            &params,
            generation.route_cache(),
            pipeline.core().server_like(),
        )
        .await?;
        let cookies = Cookies::from_headers(request.headers());

        Ok(Self {
            pipeline,
            generation,
            request,
            route,
            component,
            url,
            pathname,
            params,
            props,
            status: None,
            cookies,
            error: None,
            current_locale: None,
            component_metadata: None,
        })
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn generation(&self) -> &Arc<Generation> {
        &self.generation
    }

    pub fn request(&self) -> &Arc<PageRequest> {
        &self.request
    }

    pub fn route(&self) -> &Arc<RouteData> {
        &self.route
    }

    pub fn component(&self) -> &Arc<ComponentInstance> {
        &self.component
    }

    /// URL being rendered; differs from the request URL after a rewrite.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Decoded pathname relative to the site base.
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Request locals. Repeated reads return the same object.
    pub fn locals(&self) -> Locals {
        self.request.locals()
    }

    /// Replace the request locals; only objects are accepted.
    pub fn set_locals(&self, value: serde_json::Value) -> Result<Locals> {
        self.request.set_locals(value)
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Status to report when the produced response is a plain 200. Explicit
    /// statuses such as redirects are left alone.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut Cookies {
        &mut self.cookies
    }

    /// The error being reported, when rendering an error page.
    pub fn error(&self) -> Option<&PipelineError> {
        self.error.as_deref()
    }

    pub(crate) fn set_error(&mut self, error: Option<Arc<PipelineError>>) {
        self.error = error;
    }

    pub fn current_locale(&self) -> Option<&str> {
        self.current_locale.as_deref()
    }

    pub fn set_current_locale(&mut self, locale: Option<String>) {
        self.current_locale = locale;
    }

    pub fn component_metadata(&self) -> Option<&ComponentMetadata> {
        self.component_metadata
            .as_ref()
            .or_else(|| self.component.metadata())
    }

    pub(crate) fn set_component_metadata(&mut self, metadata: Option<ComponentMetadata>) {
        self.component_metadata = metadata;
    }

    /// Render the current component, without middleware.
    pub async fn render_page(&mut self) -> Result<PageResponse> {
        let page = self.component.page().clone();
        page.render(self).await
    }

    /// Page-level rewrite: resolve `payload` and render that route now,
    /// returning its finished response.
    pub async fn rewrite(&mut self, payload: impl Into<RewritePayload>) -> Result<PageResponse> {
        let payload = payload.into();
        let target = self
            .pipeline
            .try_rewrite(&self.generation, &payload, &self.request, &self.route)
            .await?;

        let mut next = Self::create(
            self.pipeline.clone(),
            self.generation.clone(),
            self.request.clone(),
            target,
        )
        .await?;
        next.current_locale = self.current_locale.clone();

        let response = next.render_page().await?;
        let head = self
            .pipeline
            .head_elements(&self.generation, &next.route)
            .await?;
        Ok(next.finalize(response, &head))
    }

    /// Middleware-level rewrite: retarget this context in place.
    pub(crate) async fn retarget(&mut self, payload: RewritePayload) -> Result<()> {
        let target = self
            .pipeline
            .try_rewrite(&self.generation, &payload, &self.request, &self.route)
            .await?;

        let next = Self::create(
            self.pipeline.clone(),
            self.generation.clone(),
            self.request.clone(),
            target,
        )
        .await?;
        let current_locale = self.current_locale.take();
        *self = next;
        self.current_locale = current_locale;
        Ok(())
    }

    /// Apply the status override and cookies, and serialize head elements
    /// into HTML bodies that have not had them yet.
    pub fn finalize(&self, mut response: PageResponse, head: &HeadElements) -> PageResponse {
        if let Some(status) = self.status.filter(|_| response.status() == StatusCode::OK) {
            response.set_status(status);
        }
        for cookie in self.cookies.set_cookie_headers() {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
        if !response.head_rendered() && response.is_html() {
            let html = head.inject(&response.body_text());
            response.set_body(html);
        }
        response.mark_head_rendered();
        response
    }
}
