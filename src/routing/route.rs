//! Immutable route descriptors.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::routing::matcher::{Params, RoutePattern};

/// Stable identifier of a route within one route-table generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub u32);

impl RouteId {
    /// Reserved id of the built-in 404 route.
    pub const DEFAULT_404: RouteId = RouteId(u32::MAX - 1);
    /// Reserved id of the built-in 500 route.
    pub const DEFAULT_500: RouteId = RouteId(u32::MAX);
}

/// What backs a route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentRef {
    /// A page source file, relative to the pages directory.
    File(PathBuf),
    /// The built-in not-found page.
    Default404,
    /// The built-in server-error page.
    Default500,
}

impl ComponentRef {
    /// Key used by registries and logs.
    pub fn key(&self) -> String {
        match self {
            ComponentRef::File(path) => path.to_string_lossy().replace('\\', "/"),
            ComponentRef::Default404 => "default-404".to_string(),
            ComponentRef::Default500 => "default-500".to_string(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, ComponentRef::File(_))
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Full page or a fragment rendered in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteType {
    #[default]
    Page,
    Fragment,
}

/// A page source discovered at table-build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Path relative to the pages directory, e.g. `blog/[id].html`.
    pub file: PathBuf,
    pub prerender: bool,
    pub route_type: RouteType,
}

impl RouteEntry {
    pub fn new(file: impl Into<PathBuf>, prerender: bool) -> Self {
        Self {
            file: file.into(),
            prerender,
            route_type: RouteType::Page,
        }
    }

    pub fn with_route_type(mut self, route_type: RouteType) -> Self {
        self.route_type = route_type;
        self
    }

    /// Logical route template derived from the file path.
    pub fn route(&self) -> String {
        route_from_file(&self.file)
    }
}

/// Compiled, immutable description of one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteData {
    pub id: RouteId,
    /// Logical template, e.g. `/blog/[id]`.
    pub route: String,
    pub pattern: RoutePattern,
    pub component: ComponentRef,
    /// Concrete pathname for routes without params.
    pub pathname: Option<String>,
    pub prerender: bool,
    pub route_type: RouteType,
    /// Position in declaration order.
    pub order: usize,
}

impl RouteData {
    /// Compile a discovered entry.
    pub fn from_entry(id: RouteId, order: usize, entry: &RouteEntry) -> Self {
        let route = entry.route();
        Self::new(id, order, &route, ComponentRef::File(entry.file.clone()), entry.prerender)
            .with_route_type(entry.route_type)
    }

    pub fn new(
        id: RouteId,
        order: usize,
        route: &str,
        component: ComponentRef,
        prerender: bool,
    ) -> Self {
        let pattern = RoutePattern::parse(route);
        let pathname = (pattern.dynamic_count() == 0).then(|| route.to_string());
        Self {
            id,
            route: route.to_string(),
            pattern,
            component,
            pathname,
            prerender,
            route_type: RouteType::Page,
            order,
        }
    }

    pub fn with_route_type(mut self, route_type: RouteType) -> Self {
        self.route_type = route_type;
        self
    }

    /// The in-memory 404 route used when no user page exists.
    pub fn default_404() -> Self {
        Self::new(RouteId::DEFAULT_404, usize::MAX, "/404", ComponentRef::Default404, false)
    }

    /// The in-memory 500 route used when no user page exists.
    pub fn default_500() -> Self {
        Self::new(RouteId::DEFAULT_500, usize::MAX, "/500", ComponentRef::Default500, false)
    }

    pub fn is_dynamic(&self) -> bool {
        self.pattern.dynamic_count() > 0
    }

    pub fn is_404(&self) -> bool {
        self.route == "/404"
    }

    pub fn is_500(&self) -> bool {
        self.route == "/500"
    }

    /// Extract params for a normalized pathname.
    pub fn params(&self, pathname: &str) -> Option<Params> {
        self.pattern.matches(pathname)
    }

    /// Concrete pathname for `params`, or `None` if a required param is missing.
    pub fn generate(&self, params: &Params) -> Option<String> {
        self.pattern.generate(params)
    }
}

/// `blog/[id].html` → `/blog/[id]`, `docs/index.html` → `/docs`.
pub fn route_from_file(file: &Path) -> String {
    let stem = file.with_extension("");
    let mut parts: Vec<String> = stem
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if parts.last().is_some_and(|last| last == "index") {
        parts.pop();
    }

    format!("/{}", parts.join("/"))
}
