//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging and the optional metrics exporter
//! - Scan pages and assemble the pipeline for the chosen command
//! - Bind the listener last, once everything else is ready
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Production serving compiles every page before accepting traffic

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use url::Url;

use crate::config::{ConfigError, PipelineConfig};
use crate::dev::{apply_changes, rescan, SourceWatcher};
use crate::error::PipelineError;
use crate::http::HttpServer;
use crate::lifecycle::{shutdown_signal, Shutdown};
use crate::loader::{Compiler, HtmlCompiler, ModuleRegistry};
use crate::observability::{logging, metrics};
use crate::pipeline::{App, BuildManifest, DevPipeline, ProductionPipeline};
use crate::prerender::{self, GenerateError, GeneratedPage};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to watch pages: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("Invalid site origin: {0}")]
    InvalidOrigin(#[from] url::ParseError),
}

/// Logging first, then the Prometheus exporter if enabled.
pub fn init_observability(config: &PipelineConfig) {
    logging::init_logging(&config.observability);

    if !config.observability.metrics_enabled {
        return;
    }
    match config.observability.metrics_address.parse() {
        Ok(addr) => metrics::init_metrics(addr),
        Err(_) => tracing::error!(
            metrics_address = %config.observability.metrics_address,
            "Failed to parse metrics address"
        ),
    }
}

/// Development pipeline over the pages directory, compiling on demand.
pub fn dev_pipeline(config: Arc<PipelineConfig>) -> Result<Arc<DevPipeline>, StartupError> {
    let table = rescan(&config)?;
    tracing::info!(routes = table.len(), dir = %config.pages.dir.display(), "Routes scanned");
    let root = config.pages.dir.clone();
    Ok(Arc::new(DevPipeline::new(
        config,
        table,
        Arc::new(HtmlCompiler::new()),
        root,
    )))
}

/// Production pipeline with every page precompiled.
pub async fn production_pipeline(config: Arc<PipelineConfig>) -> Result<ProductionPipeline, StartupError> {
    let table = rescan(&config)?;
    let compiler = HtmlCompiler::new();
    let root = config.pages.dir.clone();

    let registry = ModuleRegistry::precompile(&compiler as &dyn Compiler, &root, &table).await?;
    let manifest = BuildManifest::collect(&compiler, &root, &table).await?;
    tracing::info!(routes = table.len(), modules = registry.len(), "Production pipeline ready");
    Ok(ProductionPipeline::new(config, table, registry, manifest))
}

/// `dev`: serve with on-demand compilation and a source watcher.
pub async fn run_dev(config: Arc<PipelineConfig>) -> Result<(), StartupError> {
    let pipeline = dev_pipeline(config.clone())?;
    let shutdown = Shutdown::new();

    let (watcher, changes) = SourceWatcher::new(&config.pages.dir, config.pages.extensions.clone());
    // Watching stops when this handle drops at the end of the function.
    let _watcher = watcher.run()?;
    tokio::spawn(apply_changes(
        pipeline.clone(),
        config.clone(),
        changes,
        shutdown.subscribe(),
    ));

    serve(Arc::new(App::new(pipeline)), config, shutdown).await
}

/// `serve`: precompile, then serve.
pub async fn run_serve(config: Arc<PipelineConfig>) -> Result<(), StartupError> {
    let pipeline = production_pipeline(config.clone()).await?;
    serve(Arc::new(App::new(Arc::new(pipeline))), config, Shutdown::new()).await
}

/// `build`: precompile and write every prerendered page under `out_dir`.
pub async fn run_build(config: Arc<PipelineConfig>, out_dir: &Path) -> Result<Vec<GeneratedPage>, StartupError> {
    let origin = match &config.site.url {
        Some(url) => Url::parse(url)?,
        None => Url::parse("http://localhost")?,
    };
    let pipeline = production_pipeline(config).await?;
    let app = App::new(Arc::new(pipeline));
    Ok(prerender::generate(&app, &origin, out_dir).await?)
}

async fn serve(app: Arc<App>, config: Arc<PipelineConfig>, shutdown: Shutdown) -> Result<(), StartupError> {
    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    tokio::spawn(shutdown_signal(shutdown.clone()));
    let server = HttpServer::new(app, config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
