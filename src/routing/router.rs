//! Route table lookup.
//!
//! # Responsibilities
//! - Store compiled routes in priority order
//! - Look up the best matching route for a pathname
//! - Return matched route or explicit no-match
//! - Provide the custom or built-in 404/500 routes
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) linear scan in priority order, first match wins
//! - Priority: routes without a rest segment first, then more literal
//!   segments, then fewer dynamic segments, then declaration order
//! - Rebuilt wholesale on structural change, never mutated in place

use std::cmp::Reverse;
use std::sync::Arc;

use crate::config::TrailingSlash;
use crate::routing::matcher::normalize_pathname;
use crate::routing::route::{RouteData, RouteEntry, RouteId};

/// Ordered, immutable collection of routes.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Arc<RouteData>>,
    trailing_slash: TrailingSlash,
    default_404: Arc<RouteData>,
    default_500: Arc<RouteData>,
}

impl RouteTable {
    /// Compile entries given in declaration order.
    pub fn from_entries(entries: &[RouteEntry], trailing_slash: TrailingSlash) -> Self {
        let routes = entries
            .iter()
            .enumerate()
            .map(|(order, entry)| RouteData::from_entry(RouteId(order as u32), order, entry))
            .collect();
        Self::from_routes(routes, trailing_slash)
    }

    /// Build from already compiled routes; they are re-sorted by priority.
    pub fn from_routes(mut routes: Vec<RouteData>, trailing_slash: TrailingSlash) -> Self {
        routes.sort_by_key(|route| {
            (
                route.pattern.has_rest(),
                Reverse(route.pattern.literal_count()),
                route.pattern.dynamic_count(),
                route.order,
            )
        });

        Self {
            routes: routes.into_iter().map(Arc::new).collect(),
            trailing_slash,
            default_404: Arc::new(RouteData::default_404()),
            default_500: Arc::new(RouteData::default_500()),
        }
    }

    /// Routes in priority order.
    pub fn routes(&self) -> &[Arc<RouteData>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn trailing_slash(&self) -> TrailingSlash {
        self.trailing_slash
    }

    /// Best match for a raw (still encoded) pathname.
    pub fn match_path(&self, pathname: &str) -> Option<Arc<RouteData>> {
        let normalized = normalize_pathname(pathname, self.trailing_slash)?;
        self.match_normalized(&normalized)
    }

    /// Best match for a pathname that is already decoded and normalized.
    pub fn match_normalized(&self, normalized: &str) -> Option<Arc<RouteData>> {
        self.routes
            .iter()
            .find(|route| route.pattern.matches(normalized).is_some())
            .cloned()
    }

    /// Like [`RouteTable::match_path`], but `/404` always resolves, to the
    /// custom 404 route if there is one, else the built-in route. The `/404`
    /// check ignores the trailing slash policy.
    pub fn match_with_fallback_404(&self, pathname: &str) -> Option<Arc<RouteData>> {
        if let Some(route) = self.match_path(pathname) {
            return Some(route);
        }
        let bare = normalize_pathname(pathname, TrailingSlash::Ignore)?;
        (bare == "/404").then(|| self.not_found_route())
    }

    /// User-defined 404 route, if one exists.
    pub fn custom_404(&self) -> Option<Arc<RouteData>> {
        self.routes.iter().find(|r| r.is_404()).cloned()
    }

    /// User-defined 500 route, if one exists.
    pub fn custom_500(&self) -> Option<Arc<RouteData>> {
        self.routes.iter().find(|r| r.is_500()).cloned()
    }

    /// Custom 404 route, else the built-in one.
    pub fn not_found_route(&self) -> Arc<RouteData> {
        self.custom_404().unwrap_or_else(|| self.default_404.clone())
    }

    /// Custom 500 route, else the built-in one.
    pub fn server_error_route(&self) -> Arc<RouteData> {
        self.custom_500().unwrap_or_else(|| self.default_500.clone())
    }

    pub fn default_404(&self) -> &Arc<RouteData> {
        &self.default_404
    }

    pub fn default_500(&self) -> &Arc<RouteData> {
        &self.default_500
    }

    /// Look a route up by id, including the built-in ones.
    pub fn get(&self, id: RouteId) -> Option<Arc<RouteData>> {
        match id {
            RouteId::DEFAULT_404 => Some(self.default_404.clone()),
            RouteId::DEFAULT_500 => Some(self.default_500.clone()),
            _ => self.routes.iter().find(|r| r.id == id).cloned(),
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_routes(Vec::new(), TrailingSlash::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(files: &[&str]) -> RouteTable {
        let entries: Vec<RouteEntry> = files.iter().map(|f| RouteEntry::new(*f, false)).collect();
        RouteTable::from_entries(&entries, TrailingSlash::Ignore)
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let table = table(&["blog/[slug].html", "blog/[id].html"]);
        let route = table.match_path("/blog/42").unwrap();
        assert_eq!(route.route, "/blog/[slug]");
    }

    #[test]
    fn test_static_before_dynamic_before_rest() {
        let table = table(&["[...all].html", "blog/[id].html", "blog/new.html"]);
        let order: Vec<&str> = table.routes().iter().map(|r| r.route.as_str()).collect();
        assert_eq!(order, vec!["/blog/new", "/blog/[id]", "/[...all]"]);

        assert_eq!(table.match_path("/blog/new").unwrap().route, "/blog/new");
        assert_eq!(table.match_path("/blog/7").unwrap().route, "/blog/[id]");
        assert_eq!(table.match_path("/x/y/z").unwrap().route, "/[...all]");
    }

    #[test]
    fn test_rest_routes_rank_after_single_params() {
        // A catch-all loses to any route without one, even when it starts
        // with a literal segment.
        let table = table(&["blog/[...slug].html", "[a].html"]);
        assert_eq!(table.match_path("/blog").unwrap().route, "/[a]");
        assert_eq!(table.match_path("/blog/x/y").unwrap().route, "/blog/[...slug]");
    }

    #[test]
    fn test_fewer_dynamic_segments_win() {
        let table = table(&["[a]/[b].html", "[a]/b.html"]);
        assert_eq!(table.match_path("/x/b").unwrap().route, "/[a]/b");
    }

    #[test]
    fn test_no_match() {
        let table = table(&["index.html", "blog/[id].html"]);
        assert!(table.match_path("/missing").is_none());
        assert!(table.match_path("/blog/7/comments").is_none());
    }

    #[test]
    fn test_percent_encoded_pathname() {
        let table = table(&["caf\u{e9}.html"]);
        assert!(table.match_path("/caf%C3%A9").is_some());
    }

    #[test]
    fn test_fallback_404() {
        let table = table(&["index.html"]);
        assert!(table.match_path("/404").is_none());

        let route = table.match_with_fallback_404("/404").unwrap();
        assert_eq!(route.id, RouteId::DEFAULT_404);
        assert!(table.match_with_fallback_404("/405").is_none());
    }

    #[test]
    fn test_fallback_404_ignores_trailing_slash_policy() {
        for (policy, pathname) in [(TrailingSlash::Always, "/404"), (TrailingSlash::Never, "/404/")] {
            let entries = vec![RouteEntry::new("index.html", false)];
            let table = RouteTable::from_entries(&entries, policy);
            assert!(table.match_path(pathname).is_none());
            assert_eq!(table.match_with_fallback_404(pathname).unwrap().id, RouteId::DEFAULT_404);

            let entries = vec![RouteEntry::new("index.html", false), RouteEntry::new("404.html", false)];
            let table = RouteTable::from_entries(&entries, policy);
            assert_eq!(table.match_with_fallback_404(pathname).unwrap().component.key(), "404.html");
        }
    }

    #[test]
    fn test_custom_error_routes() {
        let table = table(&["index.html", "404.html"]);
        let route = table.match_with_fallback_404("/404").unwrap();
        assert_eq!(route.component.key(), "404.html");
        assert_eq!(table.not_found_route().component.key(), "404.html");
        assert_eq!(table.server_error_route().id, RouteId::DEFAULT_500);
    }

    #[test]
    fn test_get_by_id() {
        let table = table(&["index.html", "about.html"]);
        assert_eq!(table.get(RouteId(1)).unwrap().route, "/about");
        assert!(table.get(RouteId::DEFAULT_500).is_some());
        assert!(table.get(RouteId(9)).is_none());
    }
}
