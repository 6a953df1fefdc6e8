//! Response handling.
//!
//! # Responsibilities
//! - Represent what a page, middleware or error page produced
//! - Convert into an axum response at the HTTP boundary
//!
//! # Design Decisions
//! - Body is `Bytes`, so cloning a response is cheap
//! - An empty 404/500 body means "render the error page for me"

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// A rendered response.
#[derive(Debug, Clone)]
pub struct PageResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    head_rendered: bool,
}

impl PageResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            head_rendered: false,
        }
    }

    /// 200 response with an HTML body.
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))
            .with_body(body.into())
    }

    /// 200 response with a plain text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
            .with_body(body.into())
    }

    /// Bodyless status response; 404 and 500 are rerouted to error pages.
    pub fn status_only(status: StatusCode) -> Self {
        Self::new(status)
    }

    /// Redirect to `location`. Locations that are not valid header values
    /// fall back to `/`.
    pub fn redirect(location: &str, status: StatusCode) -> Self {
        let value = HeaderValue::from_str(location).unwrap_or_else(|_| HeaderValue::from_static("/"));
        Self::new(status).with_header(header::LOCATION, value)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Body as UTF-8, lossy.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_html(&self) -> bool {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"))
    }

    /// True for empty 404/500 responses that should show the error page.
    pub fn is_reroutable(&self) -> bool {
        matches!(self.status, StatusCode::NOT_FOUND | StatusCode::INTERNAL_SERVER_ERROR)
            && self.body.is_empty()
    }

    pub(crate) fn head_rendered(&self) -> bool {
        self.head_rendered
    }

    pub(crate) fn mark_head_rendered(&mut self) {
        self.head_rendered = true;
    }
}

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
