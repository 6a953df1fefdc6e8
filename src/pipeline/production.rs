//! Production pipeline.
//!
//! Components come from a precompiled [`ModuleRegistry`]; heads come from
//! per-route build assets and are cached for the life of the generation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{PipelineConfig, RuntimeMode};
use crate::error::Result;
use crate::loader::{Compiler, ComponentInstance, ComponentLoader, ComponentMetadata, ModuleRegistry};
use crate::middleware::Middleware;
use crate::pipeline::{Generation, Pipeline, PipelineCore};
use crate::render::{AssetRef, HeadElements, RouteAssets};
use crate::routing::{ComponentRef, RouteData, RouteTable};

/// Build output consumed at runtime, keyed by component key.
#[derive(Debug, Clone, Default)]
pub struct BuildManifest {
    pub assets: HashMap<String, RouteAssets>,
    pub metadata: HashMap<String, ComponentMetadata>,
}

impl BuildManifest {
    /// Ask `compiler` for the head assets and metadata of every file-backed
    /// route in `table`.
    pub async fn collect(compiler: &dyn Compiler, root: &Path, table: &RouteTable) -> Result<Self> {
        let mut manifest = Self::default();
        for route in table.routes() {
            let ComponentRef::File(file) = &route.component else {
                continue;
            };
            let source = root.join(file);
            let styles = compiler.styles(&source).await?;
            let scripts = compiler.hoisted_scripts(&source).await?;

            let assets = RouteAssets {
                links: styles.urls,
                scripts: scripts
                    .into_iter()
                    .map(|script| match script.props.get("src") {
                        Some(src) => AssetRef::External(src.clone()),
                        None => AssetRef::Inline(script.children),
                    })
                    .collect(),
                styles: styles
                    .inline
                    .into_iter()
                    .map(|style| AssetRef::Inline(style.content))
                    .collect(),
            };
            let key = route.component.key();
            if let Some(metadata) = compiler.component_metadata(&source).await? {
                manifest.metadata.insert(key.clone(), metadata);
            }
            manifest.assets.insert(key, assets);
        }
        Ok(manifest)
    }
}

pub struct ProductionPipeline {
    core: PipelineCore,
    loader: ComponentLoader,
    manifest: BuildManifest,
}

impl ProductionPipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        table: RouteTable,
        registry: ModuleRegistry,
        manifest: BuildManifest,
    ) -> Self {
        Self {
            core: PipelineCore::new(config, RuntimeMode::Production, table),
            loader: ComponentLoader::precompiled(registry),
            manifest,
        }
    }

    pub fn with_middleware(mut self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.core = self.core.with_middleware(middleware);
        self
    }
}

#[async_trait]
impl Pipeline for ProductionPipeline {
    fn core(&self) -> &PipelineCore {
        &self.core
    }

    async fn head_elements(&self, generation: &Generation, route: &RouteData) -> Result<Arc<HeadElements>> {
        if let Some(head) = generation.heads().get(&route.id) {
            return Ok(head.value().clone());
        }
        let assets = self.manifest.assets.get(&route.component.key());
        let head = Arc::new(self.core.head_assembler().from_assets(route, assets));
        generation.heads().insert(route.id, head.clone());
        Ok(head)
    }

    async fn component_metadata(&self, route: &RouteData) -> Result<Option<ComponentMetadata>> {
        Ok(self.manifest.metadata.get(&route.component.key()).cloned())
    }

    async fn get_component_by_route(
        &self,
        generation: &Generation,
        route: &RouteData,
    ) -> Result<Arc<ComponentInstance>> {
        self.loader.load(route, generation.components()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::PageRequest;
    use crate::loader::HtmlCompiler;
    use crate::pipeline::App;
    use crate::routing::RouteEntry;

    #[tokio::test]
    async fn test_precompiled_render_with_manifest_head() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><head></head><body>hi</body></html>").unwrap();
        std::fs::write(dir.path().join("index.css"), "body { color: red }").unwrap();

        let config = Arc::new(PipelineConfig::default());
        let table = RouteTable::from_entries(&[RouteEntry::new("index.html", false)], config.site.trailing_slash);
        let compiler = HtmlCompiler::new();
        let registry = ModuleRegistry::precompile(&compiler, dir.path(), &table).await.unwrap();
        let manifest = BuildManifest::collect(&compiler, dir.path(), &table).await.unwrap();
        assert_eq!(manifest.assets["index.html"].styles.len(), 1);

        let app = App::new(Arc::new(ProductionPipeline::new(config, table, registry, manifest)));
        let response = app.render(PageRequest::get("http://localhost/").unwrap()).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert!(response.body_text().contains("<style>body { color: red }</style></head>"));
    }

    #[tokio::test]
    async fn test_missing_module_renders_500() {
        let config = Arc::new(PipelineConfig::default());
        let table = RouteTable::from_entries(&[RouteEntry::new("about.html", false)], config.site.trailing_slash);
        let pipeline = ProductionPipeline::new(config, table, ModuleRegistry::new(), BuildManifest::default());
        let app = App::new(Arc::new(pipeline));

        let response = app.render(PageRequest::get("http://localhost/about").unwrap()).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
