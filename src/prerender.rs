//! Static generation of prerendered routes.
//!
//! # Data Flow
//! ```text
//! live route table
//!     → prerendered routes only
//!     → static pathname, or one pathname per static path entry
//!     → App::render(GET <origin><base><pathname>)
//!     → <out>/<pathname>/index.html (404.html, 500.html for error routes)
//! ```

use std::path::{Path, PathBuf};

use axum::http::{Method, StatusCode};
use thiserror::Error;
use url::Url;

use crate::error::PipelineError;
use crate::http::PageRequest;
use crate::pipeline::{App, Generation, Pipeline};
use crate::routing::RouteData;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One written file.
#[derive(Debug, Clone)]
pub struct GeneratedPage {
    pub route: String,
    pub pathname: String,
    pub output: PathBuf,
    pub status: StatusCode,
}

/// Render every prerendered route into `out_dir`.
pub async fn generate(app: &App, origin: &Url, out_dir: &Path) -> Result<Vec<GeneratedPage>, GenerateError> {
    let pipeline = app.pipeline();
    let generation = pipeline.core().generation();
    let base = pipeline.core().config().site.base.trim_end_matches('/').to_string();
    let mut pages = Vec::new();

    for route in generation.table().routes().iter().filter(|r| r.prerender) {
        for pathname in pathnames(pipeline.as_ref(), &generation, route).await? {
            let output = output_path(out_dir, route, &pathname);
            let page = render_to(app, origin, &base, &pathname, &route.route, output).await?;
            pages.push(page);
        }
    }

    if generation.table().custom_404().is_none() {
        let output = out_dir.join("404.html");
        let page = render_to(app, origin, &base, "/404", "/404", output).await?;
        pages.push(page);
    }

    tracing::info!(pages = pages.len(), out_dir = %out_dir.display(), "Static generation finished");
    Ok(pages)
}

async fn render_to(
    app: &App,
    origin: &Url,
    base: &str,
    pathname: &str,
    route: &str,
    output: PathBuf,
) -> Result<GeneratedPage, GenerateError> {
    let input = format!("{base}{pathname}");
    let url = origin
        .join(&input)
        .map_err(|source| PipelineError::InvalidUrl { input, source })?;
    let response = app.render(PageRequest::new(Method::GET, url)).await?;

    if response.status().is_server_error() {
        tracing::warn!(pathname, status = %response.status(), "Prerendered page reported an error");
    }
    write_file(&output, response.body()).await?;
    tracing::debug!(pathname, output = %output.display(), "Page written");

    Ok(GeneratedPage {
        route: route.to_string(),
        pathname: pathname.to_string(),
        output,
        status: response.status(),
    })
}

/// Concrete pathnames of a route.
async fn pathnames(
    pipeline: &dyn Pipeline,
    generation: &Generation,
    route: &RouteData,
) -> Result<Vec<String>, PipelineError> {
    if let Some(pathname) = &route.pathname {
        return Ok(vec![pathname.clone()]);
    }

    let component = pipeline.get_component_by_route(generation, route).await?;
    if component.static_paths().is_none() {
        return Err(PipelineError::GetStaticPathsRequired(route.component.key()));
    }
    let paths = generation.route_cache().static_paths(route, &component).await?;
    Ok(paths
        .iter()
        .filter_map(|path| route.generate(&path.params))
        .collect())
}

fn output_path(out_dir: &Path, route: &RouteData, pathname: &str) -> PathBuf {
    if route.is_404() {
        out_dir.join("404.html")
    } else if route.is_500() {
        out_dir.join("500.html")
    } else {
        out_dir.join(pathname.trim_start_matches('/')).join("index.html")
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), GenerateError> {
    let io_error = |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    tokio::fs::write(path, contents).await.map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{ComponentRef, RouteId};

    #[test]
    fn test_output_path() {
        let out = Path::new("/dist");
        let index = RouteData::new(RouteId(0), 0, "/", ComponentRef::File("index.html".into()), true);
        assert_eq!(output_path(out, &index, "/"), PathBuf::from("/dist/index.html"));

        let post = RouteData::new(RouteId(1), 1, "/blog/[id]", ComponentRef::File("blog/[id].html".into()), true);
        assert_eq!(output_path(out, &post, "/blog/7"), PathBuf::from("/dist/blog/7/index.html"));

        assert_eq!(output_path(out, &RouteData::default_404(), "/404"), PathBuf::from("/dist/404.html"));
    }
}
