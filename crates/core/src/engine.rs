use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    composer::{self, Outcome, RequestView, ORIGIN},
    context::CorsContext,
    error::CorsResult,
    options::{ConfigSource, CorsConfig, CorsOptionsDelegate},
    origin,
};

/// Per-request CORS driver. `R` is whatever the options delegate gets to look at.
pub struct Cors<R: ?Sized> {
    source: ConfigSource<R>,
}

impl<R: ?Sized> Clone for Cors<R> {
    fn clone(&self) -> Self { Self { source: self.source.clone() } }
}

impl<R: ?Sized> std::fmt::Debug for Cors<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cors").field("source", &self.source).finish()
    }
}

impl<R: ?Sized> Default for Cors<R> {
    fn default() -> Self { Self::new(CorsConfig::default()) }
}

impl<R: ?Sized> Cors<R> {
    pub fn new(config: CorsConfig) -> Self {
        Self { source: ConfigSource::Static(config) }
    }

    pub fn with_delegate<D: CorsOptionsDelegate<R>>(delegate: D) -> Self {
        Self { source: ConfigSource::Delegate(Arc::new(delegate)) }
    }
}

impl<R: ?Sized + Sync + 'static> Cors<R> {
    /// Writes the CORS headers for one request through `ctx`.
    ///
    /// Failures while resolving options or the origin never reach the client: the
    /// request is passed on with no CORS headers written.
    pub async fn handle<C>(&self, request: &R, ctx: &mut C) -> Outcome
    where
        C: CorsContext + Send + ?Sized,
    {
        match self.run(request, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "cors resolution failed, passing request through");
                Outcome::Continue
            }
        }
    }

    async fn run<C>(&self, request: &R, ctx: &mut C) -> CorsResult<Outcome>
    where
        C: CorsContext + Send + ?Sized,
    {
        let mut options = self.source.resolve(request).await?;

        let request_origin = ctx.request_header(ORIGIN).map(str::to_string);
        let Some(spec) = origin::resolve(&options.origin, request_origin.as_deref()).await? else {
            debug!(origin = ?request_origin, "cors disabled for request");
            return Ok(Outcome::Continue);
        };
        options.origin = spec;

        let plan = composer::compose(&options, &RequestView::from_context(&*ctx));
        Ok(plan.apply(ctx))
    }
}
