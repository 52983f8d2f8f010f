//! Terminal handlers.
//!
//! The terminal handler is what runs once every middleware has passed control
//! along. It sees only the final [`Context`] and produces the [`Endpoint`]
//! that writes the actual response.
//!
//! Two shapes are accepted:
//!
//! ```text
//! fn name(ctx: Context) -> Endpoint                     ← Handler, via Chain::then
//! async fn name(ctx: Context, req: Request) -> impl IntoResponse
//!                                                       ← HandlerFunc, via Chain::then_func
//! ```
//!
//! Both end up stored as a [`BoxedHandler`]: one `Arc`, shared by every
//! request the bound chain serves.

use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::request::Request;
use crate::response::IntoResponse;

/// The unit invoked once the chain is exhausted.
///
/// Implemented for every `Fn(Context) -> Endpoint`.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, ctx: Context) -> Endpoint;
}

impl<F> Handler for F
where
    F: Fn(Context) -> Endpoint + Send + Sync + 'static,
{
    fn handle(&self, ctx: Context) -> Endpoint {
        self(ctx)
    }
}

/// A type-erased terminal handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

// ── HandlerFunc ───────────────────────────────────────────────────────────────

/// Implemented for every `async fn(Context, Request) -> impl IntoResponse`.
///
/// You never implement this yourself. The trait is sealed: only the blanket
/// impl below satisfies it.
pub trait HandlerFunc: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> HandlerFunc for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(Arc::new(self)))
    }
}

/// Bridges a `(Context, Request)` function to [`Handler`].
///
/// The function sits behind its own `Arc` so each per-request [`Endpoint`]
/// can own a handle to it.
struct FnHandler<F>(Arc<F>);

impl<F, Fut, R> Handler for FnHandler<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn handle(&self, ctx: Context) -> Endpoint {
        let f = Arc::clone(&self.0);
        Endpoint::new(move |req| f(ctx, req))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    async fn greet(ctx: Context, req: Request) -> String {
        let name = ctx.value::<&str>("name").copied().unwrap_or("nobody");
        format!("{} {name}", req.path())
    }

    #[tokio::test]
    async fn handler_func_sees_context_and_request() {
        let handler = greet.into_boxed_handler();
        let ctx = Context::background().with_value("name", "alice");
        let req = Request::from(http::Request::builder().uri("/hi").body(Bytes::new()).unwrap());

        let res = handler.handle(ctx).call(req).await;
        assert_eq!(res.body_str(), Some("/hi alice"));
    }
}
