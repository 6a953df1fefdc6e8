//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pipeline.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the render pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// HTTP bridge settings.
    pub server: ServerConfig,

    /// Site URL, base path and output flavour.
    pub site: SiteConfig,

    /// Page discovery settings.
    pub pages: PagesConfig,

    /// Development-only injections.
    pub dev: DevConfig,

    /// Internationalized routing. Absent means no i18n middleware.
    pub i18n: Option<I18nConfig>,

    /// Scripts injected into every page head.
    pub scripts: Vec<InjectedScript>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// "development" or "production".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

/// Listener settings for the HTTP bridge.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:4321").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:4321".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Trailing slash policy applied when matching pathnames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    Always,
    Never,
    #[default]
    Ignore,
}

/// Whether pages are prerendered by default or rendered on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Static,
    Server,
}

/// Site-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Public URL of the deployed site, if known.
    pub url: Option<String>,

    /// Base path every route is mounted under.
    pub base: String,

    /// Trailing slash policy.
    pub trailing_slash: TrailingSlash,

    /// Output flavour.
    pub output: OutputMode,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: None,
            base: "/".to_string(),
            trailing_slash: TrailingSlash::Ignore,
            output: OutputMode::Static,
        }
    }
}

impl SiteConfig {
    /// True when some routes are rendered at request time.
    pub fn server_like(&self) -> bool {
        self.output == OutputMode::Server
    }
}

/// Page discovery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PagesConfig {
    /// Directory scanned for page sources.
    pub dir: PathBuf,

    /// File extensions treated as pages.
    pub extensions: Vec<String>,

    /// Route patterns prerendered even under server output.
    pub prerender: Vec<String>,

    /// Route patterns rendered as fragments: no client runtime or page
    /// scripts in their head.
    pub fragments: Vec<String>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("src/pages"),
            extensions: vec!["html".to_string()],
            prerender: Vec::new(),
            fragments: Vec::new(),
        }
    }
}

/// Development injections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DevConfig {
    /// Inject the dev toolbar bootstrap.
    pub toolbar: bool,

    /// Module path of the HMR client script.
    pub hmr_client: String,

    /// Specifier resolved through the module graph for the toolbar entrypoint.
    pub toolbar_entrypoint: String,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            toolbar: true,
            hmr_client: "/@hmr/client".to_string(),
            toolbar_entrypoint: "runtime/client/dev-toolbar/entrypoint.js".to_string(),
        }
    }
}

/// Locale routing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum I18nStrategy {
    #[default]
    PrefixOtherLocales,
    PrefixAlways,
    Manual,
}

/// Internationalized routing.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct I18nConfig {
    pub locales: Vec<String>,
    pub default_locale: String,
    pub strategy: I18nStrategy,
    /// Locale -> locale to redirect to when a page is missing.
    pub fallback: HashMap<String, String>,
}

/// When an injected script is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptStage {
    HeadInline,
    Page,
}

/// A script injected by the host (integrations, adapters).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InjectedScript {
    pub stage: ScriptStage,
    pub content: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
