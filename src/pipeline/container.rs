//! In-memory pipeline for embedding and tests.
//!
//! Routes and their components are registered programmatically instead of
//! being scanned and compiled. Each registration rebuilds the route table
//! and starts a new generation.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::config::{PipelineConfig, RuntimeMode};
use crate::error::{PipelineError, Result};
use crate::loader::{ComponentInstance, ComponentLoader, ComponentMetadata, ModuleRegistry};
use crate::middleware::Middleware;
use crate::pipeline::{Generation, Pipeline, PipelineCore};
use crate::render::{HeadElements, RouteAssets};
use crate::routing::{ComponentRef, RouteData, RouteId, RouteTable};

pub struct ContainerPipeline {
    core: PipelineCore,
    builtins: ComponentLoader,
    routes: Mutex<Vec<RouteData>>,
    components: DashMap<RouteId, Arc<ComponentInstance>>,
    assets: DashMap<RouteId, RouteAssets>,
}

impl ContainerPipeline {
    pub fn new(config: Arc<PipelineConfig>, mode: RuntimeMode) -> Self {
        Self {
            core: PipelineCore::new(config, mode, RouteTable::default()),
            builtins: ComponentLoader::precompiled(ModuleRegistry::new()),
            routes: Mutex::new(Vec::new()),
            components: DashMap::new(),
            assets: DashMap::new(),
        }
    }

    pub fn with_middleware(mut self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.core = self.core.with_middleware(middleware);
        self
    }

    /// Register an on-demand route such as `/blog/[id]`. Registering the
    /// same template again replaces its component.
    pub fn insert_route(&self, template: &str, component: ComponentInstance) -> RouteId {
        self.insert(template, component, false)
    }

    /// Register a route flagged as prerendered.
    pub fn insert_prerendered_route(&self, template: &str, component: ComponentInstance) -> RouteId {
        self.insert(template, component, true)
    }

    /// Attach head assets to a registered route.
    pub fn set_assets(&self, id: RouteId, assets: RouteAssets) {
        self.assets.insert(id, assets);
    }

    fn insert(&self, template: &str, component: ComponentInstance, prerender: bool) -> RouteId {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let id = match routes.iter_mut().find(|r| r.route == template) {
            Some(existing) => {
                existing.prerender = prerender;
                existing.id
            }
            None => {
                let order = routes.len();
                let id = RouteId(order as u32);
                let file = format!("{}.container", template.trim_start_matches('/'));
                routes.push(RouteData::new(id, order, template, ComponentRef::File(file.into()), prerender));
                id
            }
        };
        self.components.insert(id, Arc::new(component));

        let table = RouteTable::from_routes(routes.clone(), self.core.config().site.trailing_slash);
        self.core.replace_routes(table);
        id
    }
}

#[async_trait]
impl Pipeline for ContainerPipeline {
    fn core(&self) -> &PipelineCore {
        &self.core
    }

    async fn head_elements(&self, _generation: &Generation, route: &RouteData) -> Result<Arc<HeadElements>> {
        let assets = self.assets.get(&route.id).map(|r| r.value().clone());
        Ok(Arc::new(self.core.head_assembler().from_assets(route, assets.as_ref())))
    }

    async fn component_metadata(&self, route: &RouteData) -> Result<Option<ComponentMetadata>> {
        Ok(self
            .components
            .get(&route.id)
            .and_then(|c| c.value().metadata().cloned()))
    }

    async fn get_component_by_route(
        &self,
        _generation: &Generation,
        route: &RouteData,
    ) -> Result<Arc<ComponentInstance>> {
        if let Some(builtin) = self.builtins.builtin(&route.component) {
            return Ok(builtin);
        }
        self.components
            .get(&route.id)
            .map(|c| c.value().clone())
            .ok_or_else(|| PipelineError::RouteNotFound(route.route.clone()))
    }
}
