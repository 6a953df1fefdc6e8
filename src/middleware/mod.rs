//! Render middleware.
//!
//! # Data Flow
//! ```text
//! RenderContext
//!     → internal middleware (i18n.rs, when configured)
//!     → user middleware, in registration order
//!     → page render
//! ```
//!
//! # Contract
//! - A middleware returns `Ok(Some(response))` to answer the request
//! - `Ok(None)` is only valid after calling `next`; the response `next`
//!   produced is then used
//! - `Ok(None)` without calling `next` is `MiddlewareNoDataOrNextCalled`
//! - `next.rewrite` retargets the context and continues the chain there

pub mod i18n;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

pub use i18n::I18nMiddleware;

use crate::error::{PipelineError, Result};
use crate::http::PageResponse;
use crate::pipeline::RewritePayload;
use crate::render::RenderContext;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut RenderContext, next: Next<'_>) -> Result<Option<PageResponse>>;
}

/// Response slot for one middleware level.
#[derive(Default)]
struct Slot {
    called: AtomicBool,
    response: Mutex<Option<PageResponse>>,
}

/// The rest of the chain, handed to a middleware.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    slot: &'a Slot,
}

impl Next<'_> {
    /// Run the remaining middleware and the page.
    pub async fn run(self, ctx: &mut RenderContext) -> Result<PageResponse> {
        self.slot.called.store(true, Ordering::SeqCst);
        let response = run_chain(self.rest, ctx).await?;
        *self.slot.response.lock().unwrap_or_else(PoisonError::into_inner) = Some(response.clone());
        Ok(response)
    }

    /// Rewrite to `payload`, then run the remaining middleware and the new
    /// route's page.
    pub async fn rewrite(
        self,
        ctx: &mut RenderContext,
        payload: impl Into<RewritePayload>,
    ) -> Result<PageResponse> {
        ctx.retarget(payload.into()).await?;
        self.run(ctx).await
    }
}

/// Run `chain` and then the page component.
pub async fn run_chain(chain: &[Arc<dyn Middleware>], ctx: &mut RenderContext) -> Result<PageResponse> {
    let Some((first, rest)) = chain.split_first() else {
        return ctx.render_page().await;
    };

    let slot = Slot::default();
    let next = Next { rest, slot: &slot };
    match first.handle(ctx, next).await? {
        Some(response) => Ok(response),
        None if slot.called.load(Ordering::SeqCst) => slot
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(PipelineError::MiddlewareNoDataOrNextCalled),
        None => Err(PipelineError::MiddlewareNoDataOrNextCalled),
    }
}
