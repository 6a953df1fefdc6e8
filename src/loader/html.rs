//! HTML template compiler.
//!
//! Pages are plain HTML files with `{{ expression }}` placeholders:
//!
//! ```text
//! {{ id }}            route param `id`
//! {{ props.title }}   prop `title` from the static path generator
//! {{ locals.user }}   request locals key `user`
//! ```
//!
//! Sibling files extend a page:
//! - `name.paths.json`: static path list for dynamic routes
//! - `name.css`: stylesheet inlined into the head
//! - `name.js`: module script hoisted into the head

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{PipelineError, Result, SourceLocation};
use crate::http::PageResponse;
use crate::loader::compiler::{Compiler, InlineStyle, PageStyles};
use crate::loader::component::{ComponentInstance, Page, StaticPathList};
use crate::render::head::SsrElement;
use crate::render::templates::escape_html;
use crate::render::RenderContext;

/// Compiles `{{ }}` HTML templates from disk.
#[derive(Debug, Clone, Default)]
pub struct HtmlCompiler;

impl HtmlCompiler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Compiler for HtmlCompiler {
    async fn compile(&self, source: &Path) -> Result<ComponentInstance> {
        let text = read_source(source).await?;
        let parts = parse_template(&text, source)?;
        let mut instance =
            ComponentInstance::new(TemplatePage { parts }).with_renderers(vec!["html".to_string()]);

        let paths_file = source.with_extension("paths.json");
        if let Some(json) = read_optional(&paths_file).await? {
            let value: Value = serde_json::from_str(&json).map_err(|e| PipelineError::Compile {
                message: format!("Invalid static paths file: {e}"),
                location: Some(SourceLocation {
                    file: paths_file.clone(),
                    line: e.line() as u32,
                    column: e.column() as u32,
                }),
            })?;
            instance = instance.with_static_paths(StaticPathList(value));
        }

        tracing::debug!(source = %source.display(), "Compiled page");
        Ok(instance)
    }

    async fn hoisted_scripts(&self, source: &Path) -> Result<Vec<SsrElement>> {
        let script = source.with_extension("js");
        Ok(match tokio::fs::try_exists(&script).await {
            Ok(true) => vec![SsrElement::module_script(fs_url(&script))],
            _ => Vec::new(),
        })
    }

    async fn styles(&self, source: &Path) -> Result<PageStyles> {
        let stylesheet = source.with_extension("css");
        let mut styles = PageStyles::default();
        if let Some(content) = read_optional(&stylesheet).await? {
            styles.inline.push(InlineStyle {
                id: stylesheet.display().to_string(),
                content,
            });
        }
        Ok(styles)
    }
}

fn fs_url(path: &Path) -> String {
    format!("/@fs/{}", path.display().to_string().trim_start_matches('/'))
}

async fn read_source(source: &Path) -> Result<String> {
    tokio::fs::read_to_string(source).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PipelineError::RouteNotFound(source.display().to_string()),
        _ => PipelineError::Compile {
            message: format!("Failed to read {}: {e}", source.display()),
            location: None,
        },
    })
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PipelineError::Compile {
            message: format!("Failed to read {}: {e}", path.display()),
            location: None,
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Param(String),
    Prop(String),
    Local(String),
}

fn parse_template(source: &str, file: &Path) -> Result<Vec<Part>> {
    let mut parts = Vec::new();
    let mut rest = source;
    let mut offset = 0;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            parts.push(Part::Text(rest[..open].to_string()));
        }
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            return Err(compile_error("Unclosed `{{` expression", source, offset + open, file));
        };

        let expression = after[..close].trim();
        let part = match expression.split_once('.') {
            Some(("props", key)) if !key.is_empty() => Part::Prop(key.to_string()),
            Some(("locals", key)) if !key.is_empty() => Part::Local(key.to_string()),
            None if is_identifier(expression) => Part::Param(expression.to_string()),
            _ => {
                return Err(compile_error(
                    &format!("Invalid expression `{expression}`"),
                    source,
                    offset + open,
                    file,
                ))
            }
        };
        parts.push(part);

        let consumed = open + 2 + close + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        parts.push(Part::Text(rest.to_string()));
    }
    Ok(parts)
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn compile_error(message: &str, source: &str, at: usize, file: &Path) -> PipelineError {
    let before = &source[..at];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(at, |nl| at - nl - 1) + 1;
    PipelineError::Compile {
        message: message.to_string(),
        location: Some(SourceLocation {
            file: PathBuf::from(file),
            line: line as u32,
            column: column as u32,
        }),
    }
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

struct TemplatePage {
    parts: Vec<Part>,
}

#[async_trait]
impl Page for TemplatePage {
    async fn render(&self, ctx: &mut RenderContext) -> Result<PageResponse> {
        let locals = ctx.locals();
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Param(name) => {
                    out.push_str(&escape_html(ctx.params().get(name).map_or("", String::as_str)))
                }
                Part::Prop(key) => out.push_str(&escape_html(&value_text(ctx.props().get(key)))),
                Part::Local(key) => {
                    let text = {
                        let guard = locals.read().unwrap_or_else(std::sync::PoisonError::into_inner);
                        value_text(guard.get(key))
                    };
                    out.push_str(&escape_html(&text));
                }
            }
        }
        Ok(PageResponse::html(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template() {
        let parts = parse_template("<h1>{{ props.title }}</h1><p>{{id}}</p>", Path::new("p.html")).unwrap();
        assert_eq!(
            parts,
            vec![
                Part::Text("<h1>".into()),
                Part::Prop("title".into()),
                Part::Text("</h1><p>".into()),
                Part::Param("id".into()),
                Part::Text("</p>".into()),
            ]
        );
    }

    #[test]
    fn test_single_braces_are_text() {
        let parts = parse_template("<style>body{margin:0}</style>", Path::new("p.html")).unwrap();
        assert_eq!(parts, vec![Part::Text("<style>body{margin:0}</style>".into())]);
    }

    #[test]
    fn test_unclosed_expression_location() {
        let err = parse_template("<html>\n  <p>{{ id </p>", Path::new("pages/x.html")).unwrap_err();
        let location = err.location().unwrap();
        assert_eq!(location.line, 2);
        assert_eq!(location.column, 6);
        assert_eq!(err.name(), "CompilerError");
    }

    #[test]
    fn test_invalid_expression() {
        let err = parse_template("{{ a b }}", Path::new("p.html")).unwrap_err();
        assert!(err.to_string().contains("Invalid expression"));
    }

    #[tokio::test]
    async fn test_compile_reads_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("[id].html");
        std::fs::write(&page, "<p>{{ id }}</p>").unwrap();
        std::fs::write(dir.path().join("[id].paths.json"), r#"[{"params":{"id":"1"}}]"#).unwrap();
        std::fs::write(dir.path().join("[id].css"), "p{color:red}").unwrap();

        let compiler = HtmlCompiler::new();
        let instance = compiler.compile(&page).await.unwrap();
        assert!(instance.static_paths().is_some());

        let styles = compiler.styles(&page).await.unwrap();
        assert_eq!(styles.inline[0].content, "p{color:red}");
        assert!(compiler.hoisted_scripts(&page).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = HtmlCompiler::new()
            .compile(&dir.path().join("gone.html"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
