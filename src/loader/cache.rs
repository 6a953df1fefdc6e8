//! Per-generation component cache.

use std::sync::Arc;

use dashmap::DashMap;

use crate::loader::component::ComponentInstance;
use crate::observability::metrics;
use crate::routing::RouteId;

/// A thread-safe cache of loaded components, keyed by route.
///
/// Entries are inserted whole, after loading finished; a load that is
/// dropped midway leaves nothing behind.
#[derive(Clone, Default)]
pub struct ComponentCache {
    inner: Arc<DashMap<RouteId, Arc<ComponentInstance>>>,
}

impl ComponentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RouteId) -> Option<Arc<ComponentInstance>> {
        let hit = self.inner.get(&id).map(|r| r.value().clone());
        metrics::record_component_cache(hit.is_some());
        hit
    }

    pub fn insert(&self, id: RouteId, component: Arc<ComponentInstance>) {
        self.inner.insert(id, component);
    }

    pub fn remove(&self, id: RouteId) {
        self.inner.remove(&id);
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
