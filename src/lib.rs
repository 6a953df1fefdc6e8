//! Request-time rendering pipeline for file-routed pages.

pub mod config;
pub mod dev;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod loader;
pub mod middleware;
pub mod observability;
pub mod pipeline;
pub mod prerender;
pub mod render;
pub mod routing;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use http::{HttpServer, PageRequest, PageResponse};
pub use lifecycle::Shutdown;
pub use pipeline::{App, Pipeline};
