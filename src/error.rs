//! Error taxonomy for the request-to-render pipeline.
//!
//! # Propagation
//! - Resolution, load and context errors are turned into an error-page
//!   state by the orchestrator and never reach the caller.
//! - Rewrite errors are returned from `rewrite` so page and middleware code
//!   can react, or let them fall through to the 500 boundary.
//! - A failure while rendering the error page itself escapes `render`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Position inside a page source, attached to compile errors when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Errors produced while resolving, loading or rendering a page.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The precompiled registry has no module for the route (stale manifest).
    #[error("No precompiled module found for component `{0}`")]
    ModuleNotFound(String),

    /// The page source failed to compile.
    #[error("{message}")]
    Compile {
        message: String,
        location: Option<SourceLocation>,
    },

    /// A route parameter was rejected for the matched pattern.
    #[error("The {param} param for route {route} is invalid. Received **{received}**.")]
    InvalidDynamicRoute {
        route: String,
        param: String,
        received: String,
    },

    #[error("Invalid type returned by `getStaticPaths`. Expected an `array`, got `{0}`")]
    InvalidGetStaticPathsReturn(&'static str),

    #[error("Invalid entry returned by getStaticPaths. Expected an object, got `{0}`")]
    InvalidGetStaticPathsEntry(&'static str),

    #[error("Invalid params given to `getStaticPaths` path. Expected an `object`, got `{0}`")]
    InvalidGetStaticPathParam(&'static str),

    #[error("Missing or empty required `params` property on `getStaticPaths` route.")]
    GetStaticPathsExpectedParams,

    #[error("Invalid getStaticPaths route parameter for `{key}`. Expected undefined, a string or a number, received `{kind}` (`{value}`)")]
    GetStaticPathsInvalidRouteParam {
        key: String,
        value: String,
        kind: &'static str,
    },

    #[error("`getStaticPaths()` function is required for dynamic routes. Make sure that you export a static path generator from `{0}`.")]
    GetStaticPathsRequired(String),

    #[error("A static path route pattern was matched, but no matching static path was found for requested path `{0}`.")]
    NoMatchingStaticPathFound(String),

    #[error("`locals` can only be assigned to an object. Other values like numbers, strings, etc. are not accepted.")]
    LocalsNotAnObject,

    #[error("Route not found for `{0}`.")]
    RouteNotFound(String),

    #[error("The route `{0}` that you tried to render doesn't exist.")]
    RewriteEncounteredAnError(String),

    #[error("You attempted to rewrite a prerendered route to the 404 route. This is not allowed.")]
    InvalidRewrite404,

    #[error("The middleware needs to either return a `Response` object or call the `next` function.")]
    MiddlewareNoDataOrNextCalled,

    #[error("Invalid URL `{input}`: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    /// Any failure raised by page or middleware code while rendering.
    #[error("{0}")]
    Render(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Stable error code, shown on the development error page.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ModuleNotFound(_) => "ModuleNotFoundError",
            Self::Compile { .. } => "CompilerError",
            Self::InvalidDynamicRoute { .. } => "InvalidDynamicRoute",
            Self::InvalidGetStaticPathsReturn(_) => "InvalidGetStaticPathsReturn",
            Self::InvalidGetStaticPathsEntry(_) => "InvalidGetStaticPathsEntry",
            Self::InvalidGetStaticPathParam(_) => "InvalidGetStaticPathParam",
            Self::GetStaticPathsExpectedParams => "GetStaticPathsExpectedParams",
            Self::GetStaticPathsInvalidRouteParam { .. } => "GetStaticPathsInvalidRouteParam",
            Self::GetStaticPathsRequired(_) => "GetStaticPathsRequired",
            Self::NoMatchingStaticPathFound(_) => "NoMatchingStaticPathFound",
            Self::LocalsNotAnObject => "LocalsNotAnObject",
            Self::RouteNotFound(_) => "RouteNotFound",
            Self::RewriteEncounteredAnError(_) => "RewriteEncounteredAnError",
            Self::InvalidRewrite404 => "InvalidRewrite404",
            Self::MiddlewareNoDataOrNextCalled => "MiddlewareNoDataOrNextCalled",
            Self::InvalidUrl { .. } => "InvalidUrl",
            Self::Render(_) => "RenderError",
        }
    }

    /// Short remediation hint, when one exists.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ModuleNotFound(_) => {
                Some("The route manifest and the precompiled modules are out of sync. Rebuild the project.")
            }
            Self::InvalidGetStaticPathsEntry(_) => {
                Some("If you're using a `.map` call, you might be looking for `.flatMap()` instead.")
            }
            Self::LocalsNotAnObject => Some(
                "If you tried to remove some information from the `locals` object, set the property to `null` instead.",
            ),
            Self::InvalidRewrite404 => {
                Some("Prerendered pages have no request-time server to dispatch a rewritten 404 to.")
            }
            _ => None,
        }
    }

    /// Source location, for compile errors that carry one.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Compile { location, .. } => location.as_ref(),
            _ => None,
        }
    }

    /// Errors that put the request into the 404 state rather than 500.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RouteNotFound(_) | Self::NoMatchingStaticPathFound(_)
        )
    }

    /// Build a render error from anything printable.
    pub fn render(message: impl fmt::Display) -> Self {
        Self::Render(message.to_string())
    }
}

/// Human-readable name of a JSON value's type, used in error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
