//! Head element assembly.
//!
//! # Responsibilities
//! - Collect scripts, stylesheets and links a page needs in its `<head>`
//! - Development: ask the compiler for hoisted scripts and styles, add the
//!   HMR client and toolbar bootstrap
//! - Production and container: read precomputed per-route assets
//! - Serialize the collected elements into the rendered HTML
//!
//! # Design Decisions
//! - Element sets are ordered and de-duplicated by value
//! - Serialization order is styles, links, scripts, inserted before
//!   `</head>`

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::config::{DevConfig, InjectedScript, RuntimeMode, ScriptStage};
use crate::error::Result;
use crate::loader::Compiler;
use crate::routing::{RouteData, RouteType};

/// Module specifier that bundles every `page`-stage injected script.
pub const PAGE_SCRIPTS_URL: &str = "/@id/page-scripts";

/// A server-rendered element: attributes plus raw children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SsrElement {
    pub props: BTreeMap<String, String>,
    pub children: String,
}

impl SsrElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn children(mut self, children: impl Into<String>) -> Self {
        self.children = children.into();
        self
    }

    /// `<script type="module" src=...>`
    pub fn module_script(src: impl Into<String>) -> Self {
        Self::new().prop("type", "module").prop("src", src)
    }

    /// `<script type="module">content</script>`
    pub fn inline_module_script(content: impl Into<String>) -> Self {
        Self::new().prop("type", "module").children(content)
    }

    /// Classic inline script.
    pub fn inline_script(content: impl Into<String>) -> Self {
        Self::new().children(content)
    }

    /// `<link rel="stylesheet" href=...>`
    pub fn stylesheet(href: impl Into<String>) -> Self {
        Self::new().prop("rel", "stylesheet").prop("href", href)
    }

    /// Render as `tag`. `link` is a void element and drops children.
    pub fn render(&self, tag: &str) -> String {
        let mut out = format!("<{tag}");
        for (name, value) in &self.props {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
        out.push('>');
        if tag != "link" {
            out.push_str(&self.children);
            out.push_str(&format!("</{tag}>"));
        }
        out
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Insertion-ordered set of elements.
#[derive(Debug, Clone, Default)]
pub struct ElementSet {
    items: Vec<SsrElement>,
    seen: HashSet<SsrElement>,
}

impl ElementSet {
    /// Returns false when an equal element was already present.
    pub fn insert(&mut self, element: SsrElement) -> bool {
        if self.seen.insert(element.clone()) {
            self.items.push(element);
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SsrElement> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Extend<SsrElement> for ElementSet {
    fn extend<T: IntoIterator<Item = SsrElement>>(&mut self, iter: T) {
        for element in iter {
            self.insert(element);
        }
    }
}

impl FromIterator<SsrElement> for ElementSet {
    fn from_iter<T: IntoIterator<Item = SsrElement>>(iter: T) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

/// Everything a page contributes to `<head>`.
#[derive(Debug, Clone, Default)]
pub struct HeadElements {
    pub scripts: ElementSet,
    pub styles: ElementSet,
    pub links: ElementSet,
}

impl HeadElements {
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.styles.is_empty() && self.links.is_empty()
    }

    /// Serialize in head order: styles, links, scripts.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for style in self.styles.iter() {
            // External stylesheets live in the style set as `<link>`s.
            let tag = if style.props.contains_key("href") { "link" } else { "style" };
            out.push_str(&style.render(tag));
        }
        for link in self.links.iter() {
            out.push_str(&link.render("link"));
        }
        for script in self.scripts.iter() {
            out.push_str(&script.render("script"));
        }
        out
    }

    /// Insert the serialized elements before `</head>`. Documents without a
    /// head get them before `<body`, or at the very start.
    pub fn inject(&self, html: &str) -> String {
        if self.is_empty() {
            return html.to_string();
        }
        let rendered = self.render();
        let lower = html.to_ascii_lowercase();
        let at = lower
            .find("</head>")
            .or_else(|| lower.find("<body"))
            .unwrap_or(0);

        let mut out = String::with_capacity(html.len() + rendered.len());
        out.push_str(&html[..at]);
        out.push_str(&rendered);
        out.push_str(&html[at..]);
        out
    }
}

/// A stylesheet or script emitted by the production build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    Inline(String),
    External(String),
}

/// Precomputed head assets for one route.
#[derive(Debug, Clone, Default)]
pub struct RouteAssets {
    pub links: Vec<String>,
    pub scripts: Vec<AssetRef>,
    pub styles: Vec<AssetRef>,
}

/// Builds [`HeadElements`] for a route in each runtime flavour.
#[derive(Debug, Clone)]
pub struct HeadAssembler {
    mode: RuntimeMode,
    base: String,
    dev: DevConfig,
    scripts: Vec<InjectedScript>,
}

impl HeadAssembler {
    pub fn new(mode: RuntimeMode, base: &str, dev: DevConfig, scripts: Vec<InjectedScript>) -> Self {
        Self {
            mode,
            base: base.to_string(),
            dev,
            scripts,
        }
    }

    /// Development head: compiler-provided scripts and styles plus the
    /// client runtime. `source` is absent for built-in pages.
    pub async fn development(
        &self,
        route: &RouteData,
        compiler: &dyn Compiler,
        source: Option<&Path>,
    ) -> Result<HeadElements> {
        let mut head = HeadElements::default();

        if self.mode == RuntimeMode::Development && route.route_type == RouteType::Page {
            head.scripts.insert(SsrElement::module_script(&self.dev.hmr_client));
            if self.dev.toolbar {
                let src = compiler.resolve_module_url(&self.dev.toolbar_entrypoint).await?;
                head.scripts.insert(SsrElement::module_script(src));
            }
        }

        self.add_injected_scripts(&mut head, route);

        if let Some(source) = source {
            head.scripts.extend(compiler.hoisted_scripts(source).await?);

            let styles = compiler.styles(source).await?;
            for url in styles.urls {
                head.links.insert(SsrElement::stylesheet(url));
            }
            for style in styles.inline {
                head.styles.insert(
                    SsrElement::new()
                        .prop("type", "text/css")
                        .prop("data-dev-id", style.id)
                        .children(style.content),
                );
            }
        }

        Ok(head)
    }

    /// Head from precomputed build assets.
    pub fn from_assets(&self, route: &RouteData, assets: Option<&RouteAssets>) -> HeadElements {
        let mut head = HeadElements::default();
        self.add_injected_scripts(&mut head, route);

        let Some(assets) = assets else {
            return head;
        };

        for link in &assets.links {
            head.links.insert(SsrElement::stylesheet(self.with_base(link)));
        }
        for script in &assets.scripts {
            head.scripts.insert(match script {
                AssetRef::Inline(content) => SsrElement::inline_module_script(content),
                AssetRef::External(src) => SsrElement::module_script(self.with_base(src)),
            });
        }
        for style in &assets.styles {
            head.styles.insert(match style {
                AssetRef::Inline(content) => SsrElement::new().children(content),
                AssetRef::External(href) => SsrElement::stylesheet(self.with_base(href)),
            });
        }
        head
    }

    fn add_injected_scripts(&self, head: &mut HeadElements, route: &RouteData) {
        for script in &self.scripts {
            match script.stage {
                ScriptStage::HeadInline => {
                    head.scripts.insert(SsrElement::inline_script(&script.content));
                }
                ScriptStage::Page if route.route_type == RouteType::Page => {
                    head.scripts.insert(SsrElement::module_script(self.with_base(PAGE_SCRIPTS_URL)));
                }
                ScriptStage::Page => {}
            }
        }
    }

    /// Prefix root-relative asset paths with the site base.
    fn with_base(&self, href: &str) -> String {
        let base = self.base.trim_end_matches('/');
        if base.is_empty() || !href.starts_with('/') || href.starts_with("//") {
            href.to_string()
        } else {
            format!("{base}{href}")
        }
    }
}
