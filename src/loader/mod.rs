//! Component loading subsystem.
//!
//! # Data Flow
//! ```text
//! RouteData
//!     → built-in 404/500? → in-memory template component
//!     → cache.rs (per-generation, keyed by route id) → hit: return
//!     → miss:
//!         development: compiler.rs (compile the source on demand)
//!         production:  registry.rs (look up the precompiled module)
//!     → insert into cache, return
//! ```
//!
//! # Design Decisions
//! - The compiler is a trait seam; `html.rs` is the bundled implementation
//! - Concurrent misses for the same route may both compile; the last
//!   insert wins and both callers get a usable instance
//! - A registry miss is a `ModuleNotFound` error, never retried

pub mod cache;
pub mod compiler;
pub mod component;
pub mod html;
pub mod registry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use cache::ComponentCache;
pub use compiler::{Compiler, InlineStyle, PageStyles};
pub use component::{
    ComponentInstance, ComponentMetadata, Page, StaticPage, StaticPathGenerator, StaticPathList,
};
pub use html::HtmlCompiler;
pub use registry::ModuleRegistry;

use crate::error::{PipelineError, Result};
use crate::render::templates::{NotFoundPage, ServerErrorPage};
use crate::routing::{ComponentRef, RouteData};

/// Where components come from.
#[derive(Clone)]
pub enum ComponentSource {
    /// Compile sources below `root` on demand.
    Compiler {
        compiler: Arc<dyn Compiler>,
        root: PathBuf,
    },
    /// Look modules up in a precompiled registry.
    Registry(Arc<ModuleRegistry>),
}

/// Loads the component for a route, consulting the cache first.
#[derive(Clone)]
pub struct ComponentLoader {
    source: ComponentSource,
    not_found: Arc<ComponentInstance>,
    server_error: Arc<ComponentInstance>,
}

impl ComponentLoader {
    pub fn new(source: ComponentSource) -> Self {
        Self {
            source,
            not_found: Arc::new(ComponentInstance::new(NotFoundPage)),
            server_error: Arc::new(ComponentInstance::new(ServerErrorPage)),
        }
    }

    pub fn compiling(compiler: Arc<dyn Compiler>, root: impl Into<PathBuf>) -> Self {
        Self::new(ComponentSource::Compiler {
            compiler,
            root: root.into(),
        })
    }

    pub fn precompiled(registry: ModuleRegistry) -> Self {
        Self::new(ComponentSource::Registry(Arc::new(registry)))
    }

    pub fn source(&self) -> &ComponentSource {
        &self.source
    }

    /// Absolute source path of a file-backed component.
    pub fn source_path(&self, component: &ComponentRef) -> Option<PathBuf> {
        match (&self.source, component) {
            (ComponentSource::Compiler { root, .. }, ComponentRef::File(file)) => Some(root.join(file)),
            _ => None,
        }
    }

    /// Component of a built-in route, if `component` is one.
    pub fn builtin(&self, component: &ComponentRef) -> Option<Arc<ComponentInstance>> {
        match component {
            ComponentRef::Default404 => Some(self.not_found.clone()),
            ComponentRef::Default500 => Some(self.server_error.clone()),
            ComponentRef::File(_) => None,
        }
    }

    pub async fn load(&self, route: &RouteData, cache: &ComponentCache) -> Result<Arc<ComponentInstance>> {
        if let Some(builtin) = self.builtin(&route.component) {
            return Ok(builtin);
        }
        if let Some(hit) = cache.get(route.id) {
            return Ok(hit);
        }

        let component = match (&self.source, &route.component) {
            (ComponentSource::Compiler { compiler, root }, ComponentRef::File(file)) => {
                Arc::new(compile_at(compiler.as_ref(), root, file).await?)
            }
            (ComponentSource::Registry(registry), _) => registry.get(&route.component.key())?,
            (ComponentSource::Compiler { .. }, _) => {
                return Err(PipelineError::RouteNotFound(route.route.clone()))
            }
        };

        cache.insert(route.id, component.clone());
        Ok(component)
    }
}

async fn compile_at(compiler: &dyn Compiler, root: &Path, file: &Path) -> Result<ComponentInstance> {
    let source = root.join(file);
    tracing::debug!(source = %source.display(), "Compiling component");
    compiler.compile(&source).await
}
