//! Development pipeline.
//!
//! # Responsibilities
//! - Compile page sources on demand through the [`Compiler`] seam
//! - Build heads from the module graph, plus the HMR client and toolbar
//! - Accept route table swaps and cache invalidation from the file watcher
//!
//! # Design Decisions
//! - Heads are not cached; sources change under a running server
//! - A rewrite that matches nothing reports `RewriteEncounteredAnError`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{PipelineConfig, RuntimeMode};
use crate::error::{PipelineError, Result};
use crate::loader::{ComponentInstance, ComponentLoader, ComponentMetadata, Compiler};
use crate::middleware::Middleware;
use crate::pipeline::{Generation, Pipeline, PipelineCore, RewritePayload};
use crate::render::HeadElements;
use crate::routing::{RouteData, RouteTable};

pub struct DevPipeline {
    core: PipelineCore,
    compiler: Arc<dyn Compiler>,
    loader: ComponentLoader,
}

impl DevPipeline {
    /// `root` is the pages directory the route table was scanned from.
    pub fn new(
        config: Arc<PipelineConfig>,
        table: RouteTable,
        compiler: Arc<dyn Compiler>,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            core: PipelineCore::new(config, RuntimeMode::Development, table),
            loader: ComponentLoader::compiling(compiler.clone(), root),
            compiler,
        }
    }

    pub fn with_middleware(mut self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.core = self.core.with_middleware(middleware);
        self
    }

    pub fn compiler(&self) -> &Arc<dyn Compiler> {
        &self.compiler
    }

    /// Swap in a rebuilt route table.
    pub fn set_routes(&self, table: RouteTable) -> u64 {
        self.core.replace_routes(table)
    }

    /// Drop cached components and props; the route table stays.
    pub fn clear_route_cache(&self) {
        self.core.generation().clear_caches();
        tracing::debug!("Component cache cleared");
    }

    /// A source file changed: forget it in the compiler and drop caches.
    pub fn invalidate(&self, source: &Path) {
        self.compiler.invalidate(source);
        self.clear_route_cache();
    }
}

#[async_trait]
impl Pipeline for DevPipeline {
    fn core(&self) -> &PipelineCore {
        &self.core
    }

    async fn head_elements(&self, _generation: &Generation, route: &RouteData) -> Result<Arc<HeadElements>> {
        let source = self.loader.source_path(&route.component);
        let head = self
            .core
            .head_assembler()
            .development(route, self.compiler.as_ref(), source.as_deref())
            .await?;
        Ok(Arc::new(head))
    }

    async fn component_metadata(&self, route: &RouteData) -> Result<Option<ComponentMetadata>> {
        match self.loader.source_path(&route.component) {
            Some(source) => self.compiler.component_metadata(&source).await,
            None => Ok(None),
        }
    }

    async fn get_component_by_route(
        &self,
        generation: &Generation,
        route: &RouteData,
    ) -> Result<Arc<ComponentInstance>> {
        self.loader.load(route, generation.components()).await
    }

    fn rewrite_miss(&self, payload: &RewritePayload) -> PipelineError {
        PipelineError::RewriteEncounteredAnError(payload.to_string())
    }
}
