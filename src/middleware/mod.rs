//! Middleware layer.
//!
//! A middleware receives the current [`Context`] and a [`Next`] continuation
//! and returns the [`Endpoint`] that will run for this request. Inside that
//! endpoint it decides whether, when, and with which context to call
//! [`Next::run`]:
//!
//! ```rust
//! use tether::{Context, Endpoint, Next, Request};
//!
//! fn token(ctx: Context, next: Next) -> Endpoint {
//!     Endpoint::new(move |req: Request| {
//!         // Derive, never mutate: earlier middleware keep their view.
//!         next.run(ctx.with_value("token", "123"), req)
//!     })
//! }
//! ```
//!
//! Not calling `next` short-circuits the chain: neither later middleware nor
//! the terminal handler run. `Next` is consumed by `run`, so it cannot be
//! called twice.
//!
//! Built-in middleware:
//! - [`Recover`] — turns a panic downstream into a `500` with a diagnostic body
//! - [`Timeout`] — races the rest of the chain against a deadline
//! - [`Trace`] — per-request span with method, path, status, latency

mod recover;
mod timeout;
mod trace;

use std::future::Future;
use std::sync::Arc;

use crate::chain::{self, Pipeline};
use crate::context::Context;
use crate::endpoint::{BoxFuture, Endpoint};
use crate::request::Request;
use crate::response::IntoResponse;

pub use recover::{Recover, Recovered, recover};
pub use timeout::Timeout;
pub use trace::Trace;

/// A composable unit of the chain.
///
/// Implemented for every `Fn(Context, Next) -> Endpoint`; implement it on
/// your own type when the middleware carries configuration.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, ctx: Context, next: Next) -> Endpoint;
}

impl<F> Middleware for F
where
    F: Fn(Context, Next) -> Endpoint + Send + Sync + 'static,
{
    fn call(&self, ctx: Context, next: Next) -> Endpoint {
        self(ctx, next)
    }
}

/// A type-erased middleware, shared by every request the chain serves.
pub type BoxedMiddleware = Arc<dyn Middleware>;

// ── Next ──────────────────────────────────────────────────────────────────────

/// The continuation: runs the remainder of the chain from the position after
/// the middleware that received it.
///
/// Holds only an `Arc` to the immutable pipeline and a position, so nothing
/// here is shared between requests.
pub struct Next {
    pipeline: Arc<Pipeline>,
    index: usize,
}

impl Next {
    pub(crate) fn new(pipeline: Arc<Pipeline>, index: usize) -> Self {
        Self { pipeline, index }
    }

    /// Runs the rest of the chain with `ctx` as the context the next unit
    /// observes.
    pub fn run(self, ctx: Context, req: Request) -> BoxFuture {
        chain::run(self.pipeline, self.index, ctx, req)
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("index", &self.index).finish()
    }
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// Middleware from an `async fn(Context, Request, Next) -> impl IntoResponse`.
///
/// ```rust
/// use tether::{Context, Next, Request, Response, middleware};
///
/// let mw = middleware::from_fn(|ctx: Context, req: Request, next: Next| async move {
///     if req.header("x-api-key").is_none() {
///         return Response::status(http::StatusCode::UNAUTHORIZED);
///     }
///     next.run(ctx, req).await
/// });
/// ```
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Context, Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn(Arc::new(f))
}

/// See [`from_fn`].
pub struct FromFn<F>(Arc<F>);

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Context, Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, ctx: Context, next: Next) -> Endpoint {
        let f = Arc::clone(&self.0);
        Endpoint::new(move |req| f(ctx, req, next))
    }
}
