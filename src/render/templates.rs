//! Built-in error pages.
//!
//! Used when the site defines no `/404` or `/500` page of its own.

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::config::RuntimeMode;
use crate::error::{PipelineError, Result};
use crate::http::PageResponse;
use crate::loader::Page;
use crate::render::RenderContext;

/// Escape text for use in HTML content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\">\
         <title>{title}</title></head><body><main>{body}</main></body></html>"
    )
}

pub fn not_found_html(pathname: &str) -> String {
    document(
        "404: Not Found",
        &format!(
            "<h1>404: Not Found</h1><p>Path: <code>{}</code></p>",
            escape_html(pathname)
        ),
    )
}

/// Development shows the error in full; production shows nothing internal.
pub fn server_error_html(error: Option<&PipelineError>, mode: RuntimeMode) -> String {
    let details = match (mode, error) {
        (RuntimeMode::Development, Some(error)) => {
            let mut details = format!(
                "<h2>{}</h2><pre>{}</pre>",
                escape_html(error.name()),
                escape_html(&error.to_string())
            );
            if let Some(hint) = error.hint() {
                details.push_str(&format!("<p>Hint: {}</p>", escape_html(hint)));
            }
            if let Some(location) = error.location() {
                details.push_str(&format!("<p>at <code>{}</code></p>", escape_html(&location.to_string())));
            }
            details
        }
        _ => String::new(),
    };
    document(
        "500: Internal Server Error",
        &format!("<h1>500: Internal Server Error</h1>{details}"),
    )
}

/// The built-in not-found page.
#[derive(Debug, Clone, Copy)]
pub struct NotFoundPage;

#[async_trait]
impl Page for NotFoundPage {
    async fn render(&self, ctx: &mut RenderContext) -> Result<PageResponse> {
        Ok(PageResponse::html(not_found_html(ctx.request().url().path())).with_status(StatusCode::NOT_FOUND))
    }
}

/// The built-in server-error page.
#[derive(Debug, Clone, Copy)]
pub struct ServerErrorPage;

#[async_trait]
impl Page for ServerErrorPage {
    async fn render(&self, ctx: &mut RenderContext) -> Result<PageResponse> {
        let mode = ctx.pipeline().core().mode();
        Ok(PageResponse::html(server_error_html(ctx.error(), mode))
            .with_status(StatusCode::INTERNAL_SERVER_ERROR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_not_found_html() {
        let html = not_found_html("/<script>");
        assert!(html.contains("404: Not Found"));
        assert!(html.contains("/&lt;script&gt;"));
        assert!(html.contains("</head>"));
    }

    #[test]
    fn test_server_error_details_only_in_development() {
        let error = PipelineError::ModuleNotFound("about.html".into());

        let dev = server_error_html(Some(&error), RuntimeMode::Development);
        assert!(dev.contains("ModuleNotFoundError"));
        assert!(dev.contains("Hint:"));

        let prod = server_error_html(Some(&error), RuntimeMode::Production);
        assert!(!prod.contains("about.html"));
    }
}
