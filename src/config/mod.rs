//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PipelineConfig (validated, immutable)
//!     → shared via Arc to every pipeline variant
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Runtime mode is chosen by the caller, not the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DevConfig, I18nConfig, I18nStrategy, InjectedScript, LogFormat, ObservabilityConfig,
    OutputMode, PagesConfig, PipelineConfig, RuntimeMode, ScriptStage, ServerConfig, SiteConfig,
    TrailingSlash,
};
