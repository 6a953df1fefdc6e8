//! Precompiled module registry used in production.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{PipelineError, Result};
use crate::loader::compiler::Compiler;
use crate::loader::component::ComponentInstance;
use crate::routing::{ComponentRef, RouteTable};

/// Immutable map from component key to instance.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<ComponentInstance>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under a component key such as `blog/[id].html`.
    pub fn with_module(mut self, key: impl Into<String>, component: ComponentInstance) -> Self {
        self.modules.insert(key.into(), Arc::new(component));
        self
    }

    pub fn get(&self, key: &str) -> Result<Arc<ComponentInstance>> {
        self.modules
            .get(key)
            .cloned()
            .ok_or_else(|| PipelineError::ModuleNotFound(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Compile every file-backed route of `table` ahead of time.
    pub async fn precompile(compiler: &dyn Compiler, root: &Path, table: &RouteTable) -> Result<Self> {
        let mut registry = Self::new();
        for route in table.routes() {
            let ComponentRef::File(file) = &route.component else {
                continue;
            };
            let component = compiler.compile(&root.join(file)).await?;
            registry.modules.insert(route.component.key(), Arc::new(component));
        }
        tracing::info!(modules = registry.len(), "Precompiled page modules");
        Ok(registry)
    }
}
