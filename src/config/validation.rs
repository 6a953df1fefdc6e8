//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, non-empty lists)
//! - Check i18n referential integrity (default and fallback locales exist)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PipelineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::PipelineConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("site.base must start with `/`, got `{0}`")]
    BaseNotAbsolute(String),

    #[error("site.url is not a valid URL: `{0}`")]
    InvalidSiteUrl(String),

    #[error("server.request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("pages.extensions must not be empty")]
    NoPageExtensions,

    #[error("i18n.locales must not be empty")]
    NoLocales,

    #[error("i18n.default_locale `{0}` is not listed in i18n.locales")]
    UnknownDefaultLocale(String),

    #[error("i18n.fallback references unknown locale `{0}`")]
    UnknownFallbackLocale(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.site.base.starts_with('/') {
        errors.push(ValidationError::BaseNotAbsolute(config.site.base.clone()));
    }

    if let Some(site) = &config.site.url {
        if Url::parse(site).is_err() {
            errors.push(ValidationError::InvalidSiteUrl(site.clone()));
        }
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.pages.extensions.is_empty() {
        errors.push(ValidationError::NoPageExtensions);
    }

    if let Some(i18n) = &config.i18n {
        if i18n.locales.is_empty() {
            errors.push(ValidationError::NoLocales);
        } else if !i18n.locales.contains(&i18n.default_locale) {
            errors.push(ValidationError::UnknownDefaultLocale(i18n.default_locale.clone()));
        }

        for (from, to) in &i18n.fallback {
            for locale in [from, to] {
                if !i18n.locales.contains(locale) {
                    errors.push(ValidationError::UnknownFallbackLocale(locale.clone()));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
