//! Rewrite targets.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{PipelineError, Result};
use crate::http::PageRequest;
use crate::loader::ComponentInstance;
use crate::routing::RouteData;

/// Where a rewrite should go.
#[derive(Debug, Clone)]
pub enum RewritePayload {
    /// An absolute URL.
    AbsoluteUrl(Url),
    /// Another request; its URL is used.
    FromRequest(Arc<PageRequest>),
    /// A path (or URL string) resolved against the current request origin.
    RelativePath(String),
}

impl RewritePayload {
    /// The absolute URL this payload names, given the current request.
    pub fn resolve(&self, request: &PageRequest) -> Result<Url> {
        match self {
            RewritePayload::AbsoluteUrl(url) => Ok(url.clone()),
            RewritePayload::FromRequest(other) => Ok(other.url().clone()),
            RewritePayload::RelativePath(path) => {
                let origin = request.origin();
                Url::parse(&origin)
                    .and_then(|base| base.join(path))
                    .map_err(|source| PipelineError::InvalidUrl {
                        input: path.clone(),
                        source,
                    })
            }
        }
    }
}

impl fmt::Display for RewritePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewritePayload::AbsoluteUrl(url) => f.write_str(url.as_str()),
            RewritePayload::FromRequest(request) => f.write_str(request.url().as_str()),
            RewritePayload::RelativePath(path) => f.write_str(path),
        }
    }
}

impl From<Url> for RewritePayload {
    fn from(url: Url) -> Self {
        RewritePayload::AbsoluteUrl(url)
    }
}

impl From<&str> for RewritePayload {
    fn from(path: &str) -> Self {
        RewritePayload::RelativePath(path.to_string())
    }
}

impl From<String> for RewritePayload {
    fn from(path: String) -> Self {
        RewritePayload::RelativePath(path)
    }
}

impl From<PageRequest> for RewritePayload {
    fn from(request: PageRequest) -> Self {
        RewritePayload::FromRequest(Arc::new(request))
    }
}

impl From<Arc<PageRequest>> for RewritePayload {
    fn from(request: Arc<PageRequest>) -> Self {
        RewritePayload::FromRequest(request)
    }
}

/// A resolved rewrite: what to render, and at which URL.
#[derive(Debug, Clone)]
pub struct RewriteTarget {
    pub route: Arc<RouteData>,
    pub component: Arc<ComponentInstance>,
    pub url: Url,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_uses_request_origin() {
        let request = PageRequest::get("https://example.com:8443/blog/1?x=1").unwrap();
        let url = RewritePayload::from("/about").resolve(&request).unwrap();
        assert_eq!(url.as_str(), "https://example.com:8443/about");
    }

    #[test]
    fn test_absolute_string_replaces_origin() {
        let request = PageRequest::get("https://example.com/").unwrap();
        let url = RewritePayload::from("https://other.test/x").resolve(&request).unwrap();
        assert_eq!(url.as_str(), "https://other.test/x");
    }

    #[test]
    fn test_from_request() {
        let request = PageRequest::get("https://example.com/").unwrap();
        let other = PageRequest::get("https://example.com/blog/7").unwrap();
        let url = RewritePayload::from(other).resolve(&request).unwrap();
        assert_eq!(url.path(), "/blog/7");
    }
}
