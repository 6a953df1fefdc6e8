//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use render_pipeline::config::{PipelineConfig, TrailingSlash};
use render_pipeline::error::{PipelineError, Result};
use render_pipeline::http::{PageRequest, PageResponse};
use render_pipeline::loader::{Compiler, ComponentInstance, Page, StaticPathList};
use render_pipeline::pipeline::{App, DevPipeline};
use render_pipeline::render::RenderContext;
use render_pipeline::routing::{RouteEntry, RouteTable};
use serde_json::Value;

/// Root the in-memory compiler pretends its sources live under.
pub const ROOT: &str = "/pages";

/// Renders its body with `[name]` replaced by the matching param and
/// `(name)` by the matching prop.
pub struct EchoPage(pub String);

#[async_trait]
impl Page for EchoPage {
    async fn render(&self, ctx: &mut RenderContext) -> Result<PageResponse> {
        let mut body = self.0.clone();
        for (name, value) in ctx.params() {
            body = body.replace(&format!("[{name}]"), value);
        }
        for (name, value) in ctx.props() {
            let text = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            body = body.replace(&format!("({name})"), &text);
        }
        Ok(PageResponse::html(body))
    }
}

#[derive(Clone)]
struct Source {
    body: String,
    paths: Option<Value>,
}

/// Compiler over in-memory sources that counts `compile` calls.
#[derive(Default)]
pub struct MemoryCompiler {
    sources: HashMap<PathBuf, Source>,
    compiles: AtomicUsize,
}

impl MemoryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page at `file`, relative to [`ROOT`].
    pub fn page(mut self, file: &str, body: &str) -> Self {
        self.sources.insert(
            Path::new(ROOT).join(file),
            Source {
                body: body.to_string(),
                paths: None,
            },
        );
        self
    }

    /// Add a page with a static path list.
    pub fn dynamic_page(mut self, file: &str, body: &str, paths: Value) -> Self {
        self.sources.insert(
            Path::new(ROOT).join(file),
            Source {
                body: body.to_string(),
                paths: Some(paths),
            },
        );
        self
    }

    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    /// Route entries for every source, in declaration order.
    pub fn entries(&self, prerender: bool) -> Vec<RouteEntry> {
        let mut files: Vec<_> = self
            .sources
            .keys()
            .filter_map(|p| p.strip_prefix(ROOT).ok())
            .map(Path::to_path_buf)
            .collect();
        files.sort();
        files.into_iter().map(|f| RouteEntry::new(f, prerender)).collect()
    }
}

#[async_trait]
impl Compiler for MemoryCompiler {
    async fn compile(&self, source: &Path) -> Result<ComponentInstance> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        let found = self
            .sources
            .get(source)
            .ok_or_else(|| PipelineError::RouteNotFound(source.display().to_string()))?;

        let component = ComponentInstance::new(EchoPage(found.body.clone()));
        Ok(match &found.paths {
            Some(paths) => component.with_static_paths(StaticPathList(paths.clone())),
            None => component,
        })
    }
}

/// Route table from file names, in declaration order.
pub fn table(files: &[&str], prerender: bool) -> RouteTable {
    let entries: Vec<_> = files.iter().map(|f| RouteEntry::new(*f, prerender)).collect();
    RouteTable::from_entries(&entries, TrailingSlash::Ignore)
}

/// Dev pipeline over `compiler`, with every source on demand.
pub fn dev_app(config: PipelineConfig, compiler: Arc<MemoryCompiler>) -> (App, Arc<DevPipeline>) {
    let table = RouteTable::from_entries(&compiler.entries(!config.site.server_like()), config.site.trailing_slash);
    let pipeline = Arc::new(DevPipeline::new(Arc::new(config), table, compiler, ROOT));
    (App::new(pipeline.clone()), pipeline)
}

/// Server-output config so dynamic routes render on demand.
pub fn server_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.site.output = render_pipeline::config::OutputMode::Server;
    config
}

pub async fn get(app: &App, path: &str) -> PageResponse {
    let request = PageRequest::get(&format!("http://localhost{path}")).unwrap();
    app.render(request).await.unwrap()
}

/// Write `files` (relative path, contents) under `dir`.
pub fn write_pages(dir: &Path, files: &[(&str, &str)]) {
    for (file, contents) in files {
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}
