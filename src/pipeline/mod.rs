//! Pipeline variants and the shared core.
//!
//! # Data Flow
//! ```text
//! PipelineConfig + RouteTable
//!     → PipelineCore (mode, base, middleware, head assembler, generation)
//!     → one variant per runtime:
//!         dev.rs        compile on demand, module-graph heads, hot swaps
//!         production.rs precompiled registry, manifest heads
//!         container.rs  routes and components registered in memory
//!     → app.rs (resolve → load → context → middleware → page → head)
//! ```
//!
//! # Design Decisions
//! - The route table and every cache derived from it live in one
//!   `Generation`, swapped atomically; in-flight renders keep the
//!   generation they started with
//! - Variants differ only in loading, head assembly and rewrite-miss
//!   reporting; resolution and rendering are shared

pub mod app;
pub mod container;
pub mod dev;
pub mod production;
pub mod rewrite;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;
use url::Url;

pub use app::App;
pub use container::ContainerPipeline;
pub use dev::DevPipeline;
pub use production::{BuildManifest, ProductionPipeline};
pub use rewrite::{RewritePayload, RewriteTarget};

use crate::config::{PipelineConfig, RuntimeMode, TrailingSlash};
use crate::error::{PipelineError, Result};
use crate::http::PageRequest;
use crate::loader::{ComponentCache, ComponentInstance, ComponentMetadata};
use crate::middleware::{I18nMiddleware, Middleware};
use crate::observability::metrics;
use crate::render::{HeadAssembler, HeadElements, RouteCache};
use crate::routing::{normalize_pathname, RouteData, RouteId, RouteTable};

/// One route table together with every cache derived from it.
pub struct Generation {
    number: u64,
    table: RouteTable,
    components: ComponentCache,
    route_cache: RouteCache,
    heads: DashMap<RouteId, Arc<HeadElements>>,
}

impl Generation {
    pub fn new(number: u64, table: RouteTable) -> Self {
        Self {
            number,
            table,
            components: ComponentCache::new(),
            route_cache: RouteCache::new(),
            heads: DashMap::new(),
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn components(&self) -> &ComponentCache {
        &self.components
    }

    pub fn route_cache(&self) -> &RouteCache {
        &self.route_cache
    }

    pub(crate) fn heads(&self) -> &DashMap<RouteId, Arc<HeadElements>> {
        &self.heads
    }

    /// Drop cached components, props and heads; the table stays.
    pub fn clear_caches(&self) {
        self.components.clear();
        self.route_cache.clear();
        self.heads.clear();
    }
}

/// State shared by every pipeline variant.
pub struct PipelineCore {
    config: Arc<PipelineConfig>,
    mode: RuntimeMode,
    site: Option<Url>,
    base: String,
    middleware: Vec<Arc<dyn Middleware>>,
    head: HeadAssembler,
    generation: ArcSwap<Generation>,
    next_generation: AtomicU64,
}

impl PipelineCore {
    pub fn new(config: Arc<PipelineConfig>, mode: RuntimeMode, table: RouteTable) -> Self {
        let base = config.site.base.trim_end_matches('/').to_string();
        let site = config.site.url.as_deref().and_then(|u| Url::parse(u).ok());
        let head = HeadAssembler::new(mode, &config.site.base, config.dev.clone(), config.scripts.clone());

        let middleware: Vec<Arc<dyn Middleware>> = config
            .i18n
            .clone()
            .and_then(|i18n| I18nMiddleware::new(i18n, &config.site.base))
            .map(|m| Arc::new(m) as Arc<dyn Middleware>)
            .into_iter()
            .collect();

        metrics::record_route_generation(1, table.len());
        Self {
            config,
            mode,
            site,
            base,
            middleware,
            head,
            generation: ArcSwap::from_pointee(Generation::new(1, table)),
            next_generation: AtomicU64::new(2),
        }
    }

    /// Append user middleware after the internal ones.
    pub fn with_middleware(mut self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.middleware.extend(middleware);
        self
    }

    pub fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    /// True when some routes render on demand.
    pub fn server_like(&self) -> bool {
        self.config.site.server_like()
    }

    pub fn site(&self) -> Option<&Url> {
        self.site.as_ref()
    }

    pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    pub fn head_assembler(&self) -> &HeadAssembler {
        &self.head
    }

    /// Snapshot of the live generation.
    pub fn generation(&self) -> Arc<Generation> {
        self.generation.load_full()
    }

    /// Swap in a new route table; caches start empty. Returns the new
    /// generation number.
    pub fn replace_routes(&self, table: RouteTable) -> u64 {
        let number = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let routes = table.len();
        self.generation.store(Arc::new(Generation::new(number, table)));
        metrics::record_route_generation(number, routes);
        tracing::info!(generation = number, routes, "Route table replaced");
        number
    }

    /// Pathname relative to the site base, or `None` outside of it.
    pub fn strip_base<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.base.is_empty() {
            return Some(path);
        }
        match path.strip_prefix(self.base.as_str()) {
            Some("") => Some("/"),
            Some(rest) if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }

    /// Decoded, base-relative pathname of `url`.
    pub fn pathname(&self, url: &Url) -> String {
        let raw = self.strip_base(url.path()).unwrap_or(url.path());
        normalize_pathname(raw, TrailingSlash::Ignore).unwrap_or_else(|| raw.to_string())
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn core(&self) -> &PipelineCore;

    /// Scripts, styles and links for `route`.
    async fn head_elements(&self, generation: &Generation, route: &RouteData) -> Result<Arc<HeadElements>>;

    async fn component_metadata(&self, route: &RouteData) -> Result<Option<ComponentMetadata>>;

    async fn get_component_by_route(
        &self,
        generation: &Generation,
        route: &RouteData,
    ) -> Result<Arc<ComponentInstance>>;

    /// Error reported when a rewrite target matches no route.
    fn rewrite_miss(&self, payload: &RewritePayload) -> PipelineError {
        PipelineError::RouteNotFound(payload.to_string())
    }

    /// Resolve a rewrite payload to a route, its component and the target
    /// URL. `/404` always resolves, but not from a prerendered source.
    async fn try_rewrite(
        &self,
        generation: &Generation,
        payload: &RewritePayload,
        request: &PageRequest,
        source: &RouteData,
    ) -> Result<RewriteTarget> {
        let url = payload.resolve(request)?;
        let route = self
            .core()
            .strip_base(url.path())
            .and_then(|path| generation.table().match_with_fallback_404(path))
            .ok_or_else(|| self.rewrite_miss(payload))?;

        if route.is_404() && source.prerender {
            return Err(PipelineError::InvalidRewrite404);
        }

        let component = self.get_component_by_route(generation, &route).await?;
        metrics::record_rewrite();
        tracing::debug!(from = %source.route, to = %route.route, url = %url, "Rewrite resolved");
        Ok(RewriteTarget { route, component, url })
    }
}
