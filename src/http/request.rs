//! Request handling.
//!
//! # Responsibilities
//! - Carry the request head, body and client address through the pipeline
//! - Hold the request-scoped `locals` bag shared by every render context
//! - Build the absolute request URL from an HTTP request head
//!
//! # Design Decisions
//! - Shared via `Arc`: a rewrite builds a new render context around the
//!   same request, so locals survive rewrites
//! - Locals are only ever an object; the setter rejects anything else

use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

use axum::body::Bytes;
use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{PipelineError, Result};

/// Header carrying the request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The mutable, request-scoped locals object.
pub type Locals = Arc<RwLock<Map<String, Value>>>;

/// An incoming request as seen by the pipeline.
#[derive(Debug)]
pub struct PageRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    client_address: Option<SocketAddr>,
    locals: RwLock<Locals>,
}

impl PageRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_address: None,
            locals: RwLock::new(Arc::new(RwLock::new(Map::new()))),
        }
    }

    /// A GET request for an absolute URL string.
    pub fn get(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|source| PipelineError::InvalidUrl {
            input: url.to_string(),
            source,
        })?;
        Ok(Self::new(Method::GET, parsed))
    }

    /// Build from an HTTP request head. The host header wins over the
    /// fallback origin.
    pub fn from_parts(parts: Parts, body: Bytes, fallback_origin: &str) -> Result<Self> {
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let base = match parts.headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
            Some(host) => {
                let scheme = fallback_origin.split_once("://").map_or("http", |(scheme, _)| scheme);
                format!("{scheme}://{host}")
            }
            None => fallback_origin.trim_end_matches('/').to_string(),
        };
        let input = format!("{base}{path}");
        let url = Url::parse(&input).map_err(|source| PipelineError::InvalidUrl { input, source })?;

        Ok(Self::new(parts.method, url)
            .with_headers(parts.headers)
            .with_body(body))
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn with_client_address(mut self, addr: SocketAddr) -> Self {
        self.client_address = Some(addr);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn client_address(&self) -> Option<SocketAddr> {
        self.client_address
    }

    /// `scheme://host[:port]` of the request URL.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }

    /// The current locals object. Every reader gets the same reference.
    pub fn locals(&self) -> Locals {
        self.locals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the locals object. Anything but a JSON object is rejected.
    pub fn set_locals(&self, value: Value) -> Result<Locals> {
        let Value::Object(map) = value else {
            return Err(PipelineError::LocalsNotAnObject);
        };
        let locals: Locals = Arc::new(RwLock::new(map));
        *self.locals.write().unwrap_or_else(PoisonError::into_inner) = locals.clone();
        Ok(locals)
    }
}
