//! Static paths and props for a matched route.
//!
//! # Responsibilities
//! - Call a component's static path generator and validate its output
//! - Pick the entry matching the request's params and return its props
//! - Cache both per route generation
//!
//! # Validation order
//! ```text
//! return value is an array            → InvalidGetStaticPathsReturn
//! each entry is an object             → InvalidGetStaticPathsEntry
//! entry has non-empty `params`        → GetStaticPathsExpectedParams
//! `params` is an object               → InvalidGetStaticPathParam
//! param values are string/number/null → GetStaticPathsInvalidRouteParam
//! param names fit the route           → InvalidDynamicRoute
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::error::{json_kind, PipelineError, Result};
use crate::loader::ComponentInstance;
use crate::routing::{Params, RouteData, RouteId, Segment};

/// Props handed to a page.
pub type Props = Map<String, Value>;

/// One validated generator entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticPath {
    pub params: Params,
    pub props: Props,
}

/// Generator results and derived props, valid for one route generation.
///
/// Props are memoized per matched static-path entry, so the cache is bounded
/// by what the generators returned, not by the URLs requested.
#[derive(Debug, Clone, Default)]
pub struct RouteCache {
    static_paths: Arc<DashMap<RouteId, Arc<Vec<StaticPath>>>>,
    props: Arc<DashMap<(RouteId, Params), Arc<Props>>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.static_paths.clear();
        self.props.clear();
    }

    /// Number of memoized props entries.
    pub fn props_len(&self) -> usize {
        self.props.len()
    }

    pub fn cached_paths(&self, id: RouteId) -> Option<Arc<Vec<StaticPath>>> {
        self.static_paths.get(&id).map(|r| r.value().clone())
    }

    /// Validated static paths of `route`, calling the generator at most once
    /// per generation. Routes without a generator have none.
    pub async fn static_paths(
        &self,
        route: &RouteData,
        component: &ComponentInstance,
    ) -> Result<Arc<Vec<StaticPath>>> {
        if let Some(paths) = self.cached_paths(route.id) {
            return Ok(paths);
        }
        let Some(generator) = component.static_paths() else {
            return Ok(Arc::new(Vec::new()));
        };

        let raw = generator.generate().await?;
        let paths = validate_static_paths(raw, route.is_dynamic())?;
        if route.is_dynamic() {
            for path in &paths {
                check_param_names(route, &path.params)?;
            }
        }

        let paths = Arc::new(paths);
        self.static_paths.insert(route.id, paths.clone());
        tracing::debug!(route = %route.route, paths = paths.len(), "Static paths generated");
        Ok(paths)
    }
}

/// Props for `pathname` on `route`.
///
/// Built-in routes have no props. Static routes take props from a
/// param-less generator entry if there is one. Dynamic routes must find a
/// generator entry with exactly the request's params, unless they are
/// rendered on demand. Only props taken from an entry are memoized.
pub async fn get_props(
    route: &RouteData,
    component: &ComponentInstance,
    pathname: &str,
    params: &Params,
    cache: &RouteCache,
    server_like: bool,
) -> Result<Props> {
    if route.component.is_builtin() {
        return Ok(Props::new());
    }

    let on_demand = server_like && !route.prerender;
    if route.is_dynamic() && component.static_paths().is_none() {
        if !on_demand {
            return Err(PipelineError::GetStaticPathsRequired(route.component.key()));
        }
        return Ok(Props::new());
    }

    let key = (route.id, params.clone());
    if let Some(props) = cache.props.get(&key) {
        return Ok(props.value().as_ref().clone());
    }

    let paths = cache.static_paths(route, component).await?;
    match paths.iter().find(|path| &path.params == params) {
        Some(path) => {
            cache.props.insert(key, Arc::new(path.props.clone()));
            Ok(path.props.clone())
        }
        None if route.is_dynamic() && !on_demand => {
            Err(PipelineError::NoMatchingStaticPathFound(pathname.to_string()))
        }
        None => Ok(Props::new()),
    }
}

/// Validate raw generator output. Param-less entries are accepted only for
/// static routes.
pub fn validate_static_paths(raw: Value, dynamic: bool) -> Result<Vec<StaticPath>> {
    let entries = match raw {
        Value::Array(entries) => entries,
        other => return Err(PipelineError::InvalidGetStaticPathsReturn(json_kind(&other))),
    };

    entries
        .into_iter()
        .map(|entry| {
            let mut entry = match entry {
                Value::Object(entry) => entry,
                other => return Err(PipelineError::InvalidGetStaticPathsEntry(json_kind(&other))),
            };

            let params = match entry.remove("params") {
                None | Some(Value::Null) if dynamic => return Err(PipelineError::GetStaticPathsExpectedParams),
                None | Some(Value::Null) => Params::new(),
                Some(Value::Object(map)) if map.is_empty() && dynamic => {
                    return Err(PipelineError::GetStaticPathsExpectedParams)
                }
                Some(Value::Object(map)) => validate_params(map)?,
                Some(other) => return Err(PipelineError::InvalidGetStaticPathParam(json_kind(&other))),
            };

            let props = match entry.remove("props") {
                Some(Value::Object(props)) => props,
                Some(other) => {
                    tracing::warn!(kind = json_kind(&other), "Ignoring non-object static path props");
                    Props::new()
                }
                None => Props::new(),
            };

            Ok(StaticPath { params, props })
        })
        .collect()
}

fn validate_params(map: Map<String, Value>) -> Result<Params> {
    let mut params = Params::new();
    for (key, value) in map {
        match value {
            Value::String(s) => {
                params.insert(key, s);
            }
            Value::Number(n) => {
                params.insert(key, n.to_string());
            }
            Value::Null => {}
            other => {
                return Err(PipelineError::GetStaticPathsInvalidRouteParam {
                    key,
                    value: other.to_string(),
                    kind: json_kind(&other),
                })
            }
        }
    }
    Ok(params)
}

/// Every param must be declared by the route; every non-rest param must be
/// present.
fn check_param_names(route: &RouteData, params: &Params) -> Result<()> {
    let declared = route.pattern.param_names();
    if let Some((name, value)) = params.iter().find(|(name, _)| !declared.contains(&name.as_str())) {
        return Err(PipelineError::InvalidDynamicRoute {
            route: route.route.clone(),
            param: name.clone(),
            received: value.clone(),
        });
    }

    let required = route.pattern.segments().iter().filter_map(|segment| match segment {
        Segment::Param(name) => Some(name),
        _ => None,
    });
    for name in required {
        if !params.contains_key(name) {
            return Err(PipelineError::InvalidDynamicRoute {
                route: route.route.clone(),
                param: name.clone(),
                received: "undefined".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticPathList;
    use crate::routing::ComponentRef;
    use serde_json::json;

    fn blog_route(prerender: bool) -> RouteData {
        RouteData::new(RouteId(1), 0, "/blog/[id]", ComponentRef::File("blog/[id].html".into()), prerender)
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_validation_order() {
        assert!(matches!(
            validate_static_paths(json!({}), true),
            Err(PipelineError::InvalidGetStaticPathsReturn("object"))
        ));
        assert!(matches!(
            validate_static_paths(json!([1]), true),
            Err(PipelineError::InvalidGetStaticPathsEntry("number"))
        ));
        assert!(matches!(
            validate_static_paths(json!([{}]), true),
            Err(PipelineError::GetStaticPathsExpectedParams)
        ));
        assert!(matches!(
            validate_static_paths(json!([{ "params": "x" }]), true),
            Err(PipelineError::InvalidGetStaticPathParam("string"))
        ));
        assert!(matches!(
            validate_static_paths(json!([{ "params": { "id": true } }]), true),
            Err(PipelineError::GetStaticPathsInvalidRouteParam { kind: "boolean", .. })
        ));
    }

    #[test]
    fn test_number_params_become_strings() {
        let paths = validate_static_paths(json!([{ "params": { "id": 7, "slug": null } }]), true).unwrap();
        assert_eq!(paths[0].params, params(&[("id", "7")]));
    }

    #[test]
    fn test_static_route_allows_missing_params() {
        let paths = validate_static_paths(json!([{ "props": { "title": "Home" } }]), false).unwrap();
        assert!(paths[0].params.is_empty());
        assert_eq!(paths[0].props["title"], "Home");
    }

    #[tokio::test]
    async fn test_props_for_matching_path() {
        let component = ComponentInstance::html("").with_static_paths(StaticPathList(json!([
            { "params": { "id": "1" }, "props": { "title": "One" } },
            { "params": { "id": "2" }, "props": { "title": "Two" } },
        ])));
        let cache = RouteCache::new();
        let route = blog_route(true);

        let props = get_props(&route, &component, "/blog/2", &params(&[("id", "2")]), &cache, false)
            .await
            .unwrap();
        assert_eq!(props["title"], "Two");
        assert_eq!(cache.cached_paths(route.id).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_matching_static_path() {
        let component = ComponentInstance::html("")
            .with_static_paths(StaticPathList(json!([{ "params": { "id": "1" } }])));
        let err = get_props(&blog_route(true), &component, "/blog/9", &params(&[("id", "9")]), &RouteCache::new(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoMatchingStaticPathFound(p) if p == "/blog/9"));
    }

    #[tokio::test]
    async fn test_on_demand_route_without_generator() {
        let component = ComponentInstance::html("");
        let props = get_props(&blog_route(false), &component, "/blog/9", &params(&[("id", "9")]), &RouteCache::new(), true)
            .await
            .unwrap();
        assert!(props.is_empty());

        let err = get_props(&blog_route(true), &component, "/blog/9", &params(&[("id", "9")]), &RouteCache::new(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::GetStaticPathsRequired(_)));
    }

    #[tokio::test]
    async fn test_unmatched_urls_are_not_memoized() {
        let cache = RouteCache::new();
        let not_found = RouteData::new(RouteId(0), 0, "/404", ComponentRef::File("404.html".into()), false);
        let rest = RouteData::new(RouteId(1), 1, "/[...path]", ComponentRef::File("[...path].html".into()), false);
        let component = ComponentInstance::html("");

        for i in 0..100 {
            let pathname = format!("/missing-{i}");
            get_props(&not_found, &component, &pathname, &Params::new(), &cache, true)
                .await
                .unwrap();
            let params = params(&[("path", &pathname[1..])]);
            get_props(&rest, &component, &pathname, &params, &cache, true)
                .await
                .unwrap();
        }
        assert_eq!(cache.props_len(), 0);
    }

    #[tokio::test]
    async fn test_entry_props_are_memoized_once() {
        let component = ComponentInstance::html("")
            .with_static_paths(StaticPathList(json!([{ "params": { "id": "1" }, "props": { "n": 1 } }])));
        let cache = RouteCache::new();
        let route = blog_route(false);

        for _ in 0..3 {
            get_props(&route, &component, "/blog/1", &params(&[("id", "1")]), &cache, true)
                .await
                .unwrap();
        }
        let props = get_props(&route, &component, "/blog/2", &params(&[("id", "2")]), &cache, true)
            .await
            .unwrap();
        assert!(props.is_empty());
        assert_eq!(cache.props_len(), 1);
    }

    #[tokio::test]
    async fn test_undeclared_param_name() {
        let component = ComponentInstance::html("")
            .with_static_paths(StaticPathList(json!([{ "params": { "slug": "hello" } }])));
        let err = RouteCache::new()
            .static_paths(&blog_route(true), &component)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDynamicRoute { param, .. } if param == "slug"));
    }
}
