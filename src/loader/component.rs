//! Loaded page components.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::http::PageResponse;
use crate::render::RenderContext;

/// Renders a page for one request.
#[async_trait]
pub trait Page: Send + Sync {
    async fn render(&self, ctx: &mut RenderContext) -> Result<PageResponse>;
}

/// Enumerates the concrete paths of a dynamic route.
///
/// The returned value must be an array of `{ params, props? }` objects;
/// it is validated before use.
#[async_trait]
pub trait StaticPathGenerator: Send + Sync {
    async fn generate(&self) -> Result<Value>;
}

/// A generator backed by a fixed JSON value.
#[derive(Debug, Clone)]
pub struct StaticPathList(pub Value);

#[async_trait]
impl StaticPathGenerator for StaticPathList {
    async fn generate(&self) -> Result<Value> {
        Ok(self.0.clone())
    }
}

/// A page that always returns the same HTML.
#[derive(Debug, Clone)]
pub struct StaticPage(pub String);

#[async_trait]
impl Page for StaticPage {
    async fn render(&self, _ctx: &mut RenderContext) -> Result<PageResponse> {
        Ok(PageResponse::html(self.0.clone()))
    }
}

/// Collected facts about a component's client-side needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMetadata {
    /// Components hydrated on the client.
    pub hydrated: Vec<String>,
    /// Components rendered only on the client.
    pub client_only: Vec<String>,
    /// Whether the component renders its own `<head>`.
    pub contains_head: bool,
}

/// An instantiated page component.
#[derive(Clone)]
pub struct ComponentInstance {
    page: Arc<dyn Page>,
    static_paths: Option<Arc<dyn StaticPathGenerator>>,
    renderers: Vec<String>,
    metadata: Option<ComponentMetadata>,
}

impl ComponentInstance {
    pub fn new(page: impl Page + 'static) -> Self {
        Self {
            page: Arc::new(page),
            static_paths: None,
            renderers: Vec::new(),
            metadata: None,
        }
    }

    /// Component with a fixed HTML body.
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(StaticPage(body.into()))
    }

    pub fn with_static_paths(mut self, generator: impl StaticPathGenerator + 'static) -> Self {
        self.static_paths = Some(Arc::new(generator));
        self
    }

    pub fn with_renderers(mut self, renderers: Vec<String>) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn with_metadata(mut self, metadata: ComponentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }

    pub fn static_paths(&self) -> Option<&Arc<dyn StaticPathGenerator>> {
        self.static_paths.as_ref()
    }

    pub fn renderers(&self) -> &[String] {
        &self.renderers
    }

    pub fn metadata(&self) -> Option<&ComponentMetadata> {
        self.metadata.as_ref()
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("static_paths", &self.static_paths.is_some())
            .field("renderers", &self.renderers)
            .field("metadata", &self.metadata)
            .finish()
    }
}
