//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! resolved route + loaded component
//!     → params.rs (static paths, props; cached per generation)
//!     → context.rs (RenderContext: request, params, props, locals)
//!     → middleware chain → page render
//!     → head.rs (scripts, styles, links merged into </head>)
//!     → PageResponse
//! ```
//!
//! `templates.rs` holds the built-in 404/500 pages, `cookies.rs` the
//! request cookie jar.

pub mod context;
pub mod cookies;
pub mod head;
pub mod params;
pub mod templates;

pub use context::RenderContext;
pub use cookies::{CookieOptions, Cookies};
pub use head::{AssetRef, ElementSet, HeadAssembler, HeadElements, RouteAssets, SsrElement};
pub use params::{get_props, validate_static_paths, Props, RouteCache, StaticPath};
pub use templates::{escape_html, NotFoundPage, ServerErrorPage};
