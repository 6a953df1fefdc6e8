//! Locale routing middleware.
//!
//! Installed ahead of user middleware when `[i18n]` is configured with a
//! strategy other than `manual`.
//!
//! # Behaviour
//! - Sets the render's current locale from the first path segment
//! - `prefix-other-locales`: `/<default>/...` is not served (404)
//! - `prefix-always`: `/` redirects to `/<default>`; unprefixed paths 404
//! - A 404 under a locale with a configured fallback redirects to the same
//!   path under the fallback locale

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::config::{I18nConfig, I18nStrategy};
use crate::error::Result;
use crate::http::PageResponse;
use crate::middleware::{Middleware, Next};
use crate::render::RenderContext;

#[derive(Debug, Clone)]
pub struct I18nMiddleware {
    config: I18nConfig,
    base: String,
}

impl I18nMiddleware {
    /// `None` for the manual strategy, which leaves routing to the user.
    pub fn new(config: I18nConfig, base: &str) -> Option<Self> {
        (config.strategy != I18nStrategy::Manual).then(|| Self {
            config,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn locale_of<'a>(&self, pathname: &'a str) -> Option<&'a str> {
        let first = pathname.trim_start_matches('/').split('/').next()?;
        self.config.locales.iter().any(|l| l == first).then_some(first)
    }

    fn redirect_to(&self, pathname: &str) -> PageResponse {
        PageResponse::redirect(&format!("{}{}", self.base, pathname), StatusCode::FOUND)
    }

    /// Same path moved from `from` to the `to` locale.
    fn fallback_path(&self, pathname: &str, from: &str, to: &str) -> String {
        let rest = pathname
            .strip_prefix('/')
            .and_then(|p| p.strip_prefix(from))
            .unwrap_or("");
        let unprefixed = to == self.config.default_locale
            && self.config.strategy == I18nStrategy::PrefixOtherLocales;
        match (unprefixed, rest.is_empty()) {
            (true, true) => "/".to_string(),
            (true, false) => rest.to_string(),
            (false, _) => format!("/{to}{rest}"),
        }
    }
}

#[async_trait]
impl Middleware for I18nMiddleware {
    async fn handle(&self, ctx: &mut RenderContext, next: Next<'_>) -> Result<Option<PageResponse>> {
        let pathname = ctx.pathname().to_string();
        let locale = self.locale_of(&pathname).map(str::to_string);
        ctx.set_current_locale(Some(
            locale.clone().unwrap_or_else(|| self.config.default_locale.clone()),
        ));

        match self.config.strategy {
            I18nStrategy::PrefixOtherLocales
                if locale.as_deref() == Some(self.config.default_locale.as_str()) =>
            {
                return Ok(Some(PageResponse::status_only(StatusCode::NOT_FOUND)));
            }
            I18nStrategy::PrefixAlways if pathname == "/" => {
                return Ok(Some(self.redirect_to(&format!("/{}", self.config.default_locale))));
            }
            I18nStrategy::PrefixAlways if locale.is_none() && !ctx.route().is_404() => {
                return Ok(Some(PageResponse::status_only(StatusCode::NOT_FOUND)));
            }
            _ => {}
        }

        let response = next.run(ctx).await?;

        let not_found = response.status() == StatusCode::NOT_FOUND
            || ctx.status() == Some(StatusCode::NOT_FOUND);
        if not_found {
            if let Some((from, to)) = locale
                .as_deref()
                .and_then(|from| self.config.fallback.get(from).map(|to| (from, to)))
            {
                let target = self.fallback_path(&pathname, from, to);
                tracing::debug!(from = %pathname, to = %target, "Locale fallback redirect");
                return Ok(Some(self.redirect_to(&target)));
            }
        }
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn middleware(strategy: I18nStrategy) -> I18nMiddleware {
        I18nMiddleware::new(
            I18nConfig {
                locales: vec!["en".into(), "fr".into(), "es".into()],
                default_locale: "en".into(),
                strategy,
                fallback: HashMap::from([("fr".to_string(), "en".to_string())]),
            },
            "/",
        )
        .unwrap()
    }

    #[test]
    fn test_manual_strategy_installs_nothing() {
        let config = I18nConfig {
            strategy: I18nStrategy::Manual,
            ..Default::default()
        };
        assert!(I18nMiddleware::new(config, "/").is_none());
    }

    #[test]
    fn test_locale_of() {
        let m = middleware(I18nStrategy::PrefixOtherLocales);
        assert_eq!(m.locale_of("/fr/blog"), Some("fr"));
        assert_eq!(m.locale_of("/fr"), Some("fr"));
        assert_eq!(m.locale_of("/blog"), None);
        assert_eq!(m.locale_of("/"), None);
    }

    #[test]
    fn test_fallback_path() {
        let m = middleware(I18nStrategy::PrefixOtherLocales);
        assert_eq!(m.fallback_path("/fr/blog/1", "fr", "en"), "/blog/1");
        assert_eq!(m.fallback_path("/fr", "fr", "en"), "/");
        assert_eq!(m.fallback_path("/fr/blog", "fr", "es"), "/es/blog");

        let always = middleware(I18nStrategy::PrefixAlways);
        assert_eq!(always.fallback_path("/fr/blog", "fr", "en"), "/en/blog");
    }

    #[test]
    fn test_redirect_keeps_base() {
        let mut m = middleware(I18nStrategy::PrefixAlways);
        m.base = "/docs".into();
        let response = m.redirect_to("/en");
        assert_eq!(response.headers()[axum::http::header::LOCATION], "/docs/en");
    }
}
