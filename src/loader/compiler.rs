//! The development-time compiler seam.
//!
//! # Responsibilities
//! - Turn a page source into a [`ComponentInstance`]
//! - Answer module-graph questions used for head assembly
//!
//! # Design Decisions
//! - Everything but `compile` has a no-op default, so a minimal compiler is
//!   one method
//! - Source paths are the pages directory joined with the route file

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::loader::component::{ComponentInstance, ComponentMetadata};
use crate::render::head::SsrElement;

/// An inline stylesheet collected from the module graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineStyle {
    pub id: String,
    pub content: String,
}

/// Stylesheets a page depends on.
#[derive(Debug, Clone, Default)]
pub struct PageStyles {
    /// Linked stylesheet URLs.
    pub urls: Vec<String>,
    /// Styles inlined into the head.
    pub inline: Vec<InlineStyle>,
}

#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile one page source.
    async fn compile(&self, source: &Path) -> Result<ComponentInstance>;

    /// Browser-loadable URL for a module specifier.
    async fn resolve_module_url(&self, specifier: &str) -> Result<String> {
        Ok(format!("/@id/{specifier}"))
    }

    /// Scripts hoisted out of the page and its dependencies.
    async fn hoisted_scripts(&self, _source: &Path) -> Result<Vec<SsrElement>> {
        Ok(Vec::new())
    }

    async fn styles(&self, _source: &Path) -> Result<PageStyles> {
        Ok(PageStyles::default())
    }

    async fn component_metadata(&self, _source: &Path) -> Result<Option<ComponentMetadata>> {
        Ok(None)
    }

    /// Forget anything cached for `source`.
    fn invalidate(&self, _source: &Path) {}
}
