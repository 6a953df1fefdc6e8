//! Route pattern matching logic.
//!
//! # Responsibilities
//! - Parse filesystem-derived segments (`about`, `[id]`, `[...slug]`)
//! - Normalize request pathnames (percent-decoding, trailing slash policy)
//! - Match a normalized pathname against a pattern and extract params
//!
//! # Design Decisions
//! - Segment-level comparison only, no regex in the hot path
//! - Literal segments are case-sensitive
//! - A rest segment matches zero or more path segments
//! - A param segment never matches an empty segment

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::percent_decode_str;

use crate::config::TrailingSlash;

/// Path params extracted from a matched pattern, keyed by name.
pub type Params = BTreeMap<String, String>;

/// One segment of a compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal text, e.g. `blog`.
    Static(String),
    /// Single dynamic segment, e.g. `[id]`.
    Param(String),
    /// Catch-all, e.g. `[...slug]`.
    Rest(String),
}

impl Segment {
    /// Parse one filesystem path component.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Some(inner) => match inner.strip_prefix("...") {
                Some(name) => Segment::Rest(name.to_string()),
                None => Segment::Param(inner.to_string()),
            },
            None => Segment::Static(raw.to_string()),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Segment::Static(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static(text) => f.write_str(text),
            Segment::Param(name) => write!(f, "[{name}]"),
            Segment::Rest(name) => write!(f, "[...{name}]"),
        }
    }
}

/// An ordered list of segments compiled from a route template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a template such as `/blog/[id]`.
    pub fn parse(template: &str) -> Self {
        let segments = template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn literal_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_dynamic()).count()
    }

    pub fn dynamic_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_dynamic()).count()
    }

    pub fn has_rest(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Rest(_)))
    }

    /// Names of every dynamic segment, in pattern order.
    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) | Segment::Rest(name) => Some(name.as_str()),
                Segment::Static(_) => None,
            })
            .collect()
    }

    /// Match an already normalized pathname, returning the extracted params.
    pub fn matches(&self, pathname: &str) -> Option<Params> {
        let parts: Vec<&str> = pathname.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        match_segments(&self.segments, &parts, &mut params).then_some(params)
    }

    /// Fill the pattern with concrete params. Missing rest params produce no
    /// segment; missing single params fail.
    pub fn generate(&self, params: &Params) -> Option<String> {
        let mut out = String::new();
        for segment in &self.segments {
            let value = match segment {
                Segment::Static(text) => text.as_str(),
                Segment::Param(name) => params.get(name).filter(|v| !v.is_empty())?.as_str(),
                Segment::Rest(name) => match params.get(name) {
                    Some(value) if !value.is_empty() => value.as_str(),
                    _ => continue,
                },
            };
            out.push('/');
            out.push_str(value);
        }
        if out.is_empty() {
            out.push('/');
        }
        Some(out)
    }
}

fn match_segments(segments: &[Segment], parts: &[&str], params: &mut Params) -> bool {
    let Some((segment, rest_segments)) = segments.split_first() else {
        return parts.is_empty();
    };

    match segment {
        Segment::Static(text) => match parts.split_first() {
            Some((part, rest_parts)) if part == text => {
                match_segments(rest_segments, rest_parts, params)
            }
            _ => false,
        },
        Segment::Param(name) => match parts.split_first() {
            Some((part, rest_parts)) => {
                params.insert(name.clone(), (*part).to_string());
                if match_segments(rest_segments, rest_parts, params) {
                    true
                } else {
                    params.remove(name);
                    false
                }
            }
            None => false,
        },
        Segment::Rest(name) => {
            // Greedy first, so `[...slug]/edit` keeps as much as possible in `slug`.
            for take in (0..=parts.len()).rev() {
                if match_segments(rest_segments, &parts[take..], params) {
                    if take > 0 {
                        params.insert(name.clone(), parts[..take].join("/"));
                    }
                    return true;
                }
            }
            false
        }
    }
}

/// Decode a raw URL pathname and apply the trailing slash policy.
///
/// Returns `None` when the policy rejects the pathname outright.
pub fn normalize_pathname(raw: &str, policy: TrailingSlash) -> Option<String> {
    let decoded = raw.split('/').map(decode_segment).collect::<Vec<_>>().join("/");

    if decoded == "/" || decoded.is_empty() {
        return Some("/".to_string());
    }

    let has_trailing = decoded.ends_with('/');
    match policy {
        TrailingSlash::Never if has_trailing => return None,
        TrailingSlash::Always if !has_trailing && !last_segment_has_extension(&decoded) => {
            return None;
        }
        _ => {}
    }

    Some(decoded.trim_end_matches('/').to_string())
}

/// Decode one segment. An encoded `/` stays encoded so it cannot split
/// the segment.
fn decode_segment(segment: &str) -> String {
    match percent_decode_str(segment).decode_utf8() {
        Ok(decoded) => decoded.replace('/', "%2F"),
        Err(_) => segment.to_string(),
    }
}

fn last_segment_has_extension(pathname: &str) -> bool {
    pathname
        .rsplit('/')
        .next()
        .is_some_and(|last| last.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_parse() {
        assert_eq!(Segment::parse("blog"), Segment::Static("blog".into()));
        assert_eq!(Segment::parse("[id]"), Segment::Param("id".into()));
        assert_eq!(Segment::parse("[...slug]"), Segment::Rest("slug".into()));
    }

    #[test]
    fn test_param_match() {
        let pattern = RoutePattern::parse("/blog/[id]");
        let params = pattern.matches("/blog/7").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("7"));

        assert!(pattern.matches("/blog").is_none());
        assert!(pattern.matches("/blog/7/comments").is_none());
        assert!(pattern.matches("/news/7").is_none());
    }

    #[test]
    fn test_rest_match() {
        let pattern = RoutePattern::parse("/docs/[...slug]");
        let params = pattern.matches("/docs/a/b/c").unwrap();
        assert_eq!(params.get("slug").map(String::as_str), Some("a/b/c"));

        // Zero segments is still a match, with the param absent.
        let params = pattern.matches("/docs").unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_rest_in_the_middle() {
        let pattern = RoutePattern::parse("/[...path]/edit");
        let params = pattern.matches("/a/b/edit").unwrap();
        assert_eq!(params.get("path").map(String::as_str), Some("a/b"));
        assert!(pattern.matches("/a/b").is_none());
    }

    #[test]
    fn test_root_pattern() {
        let pattern = RoutePattern::parse("/");
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("/about").is_none());
    }

    #[test]
    fn test_generate() {
        let pattern = RoutePattern::parse("/blog/[id]");
        let mut params = Params::new();
        assert!(pattern.generate(&params).is_none());

        params.insert("id".into(), "42".into());
        assert_eq!(pattern.generate(&params).as_deref(), Some("/blog/42"));

        let rest = RoutePattern::parse("/[...slug]");
        assert_eq!(rest.generate(&Params::new()).as_deref(), Some("/"));
    }

    #[test]
    fn test_normalize_decodes() {
        assert_eq!(
            normalize_pathname("/caf%C3%A9/", TrailingSlash::Ignore).as_deref(),
            Some("/café")
        );
    }

    #[test]
    fn test_encoded_slash_stays_in_segment() {
        let normalized = normalize_pathname("/a%2Fb", TrailingSlash::Ignore).unwrap();
        assert_eq!(normalized, "/a%2Fb");

        assert!(RoutePattern::parse("/[x]/[y]").matches(&normalized).is_none());
        let params = RoutePattern::parse("/[id]").matches(&normalized).unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("a%2Fb"));
    }

    #[test]
    fn test_normalize_trailing_slash_policy() {
        assert!(normalize_pathname("/about/", TrailingSlash::Never).is_none());
        assert_eq!(normalize_pathname("/about", TrailingSlash::Never).as_deref(), Some("/about"));

        assert!(normalize_pathname("/about", TrailingSlash::Always).is_none());
        assert_eq!(normalize_pathname("/about/", TrailingSlash::Always).as_deref(), Some("/about"));
        assert_eq!(
            normalize_pathname("/feed.xml", TrailingSlash::Always).as_deref(),
            Some("/feed.xml")
        );

        assert_eq!(normalize_pathname("/", TrailingSlash::Never).as_deref(), Some("/"));
    }
}
