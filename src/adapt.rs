//! Adapter for context-unaware middleware.
//!
//! Plenty of middleware only knows how to wrap one endpoint in another:
//! basic auth, CORS, header rewriting. [`adapt`] lets such a transform sit in
//! a [`Chain`](crate::Chain) like any other middleware.
//!
//! The transform is handed an endpoint that continues the chain with the
//! context the adapter received, unchanged. It can run code before and after
//! that endpoint, or not call it at all (an auth rejection, say), but it has
//! no way to add values to the context seen further down.

use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::middleware::{Middleware, Next};

/// Wraps a context-unaware `Endpoint -> Endpoint` transform as middleware.
///
/// ```rust
/// use http::StatusCode;
/// use tether::{Chain, Context, Endpoint, Request, Response, adapt};
///
/// fn require_key(inner: Endpoint) -> Endpoint {
///     Endpoint::new(move |req: Request| async move {
///         if req.header("x-api-key").is_none() {
///             return Response::status(StatusCode::UNAUTHORIZED);
///         }
///         inner.call(req).await
///     })
/// }
///
/// let app = Chain::new()
///     .with(adapt(require_key))
///     .then_func(|_ctx: Context, _req: Request| async { "secret" });
/// ```
pub fn adapt<F>(transform: F) -> Adapted<F>
where
    F: Fn(Endpoint) -> Endpoint + Send + Sync + 'static,
{
    Adapted { transform }
}

/// See [`adapt`].
pub struct Adapted<F> {
    transform: F,
}

impl<F> Middleware for Adapted<F>
where
    F: Fn(Endpoint) -> Endpoint + Send + Sync + 'static,
{
    fn call(&self, ctx: Context, next: Next) -> Endpoint {
        let inner = Endpoint::new(move |req| next.run(ctx, req));
        (self.transform)(inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::chain::Chain;
    use crate::request::Request;
    use crate::response::Response;

    fn request() -> Request {
        Request::from(http::Request::builder().uri("/").body(Bytes::new()).unwrap())
    }

    fn add_header(inner: Endpoint) -> Endpoint {
        Endpoint::new(move |req: Request| async move {
            let res = inner.call(req).await;
            let body = res.body_str().unwrap_or_default().to_owned();
            Response::builder().header("x-wrapped", "yes").text(body)
        })
    }

    #[tokio::test]
    async fn transform_runs_around_the_rest_of_the_chain() {
        let app = Chain::new()
            .with(adapt(add_header))
            .then_func(|_ctx: Context, _req: Request| async { "inner" });

        let res = app.handle(request()).await;
        assert_eq!(res.header("x-wrapped"), Some("yes"));
        assert_eq!(res.body_str(), Some("inner"));
    }

    #[tokio::test]
    async fn context_passes_through_unchanged() {
        let app = Chain::new()
            .root_context(|_req: &Request| Context::background().with_value("k", "root"))
            .with(adapt(|inner: Endpoint| inner))
            .then(|ctx: Context| Endpoint::respond(ctx.value::<&str>("k").copied().unwrap_or("lost")));

        assert_eq!(app.handle(request()).await.body_str(), Some("root"));
    }

    #[tokio::test]
    async fn transform_can_short_circuit() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Chain::new()
            .with(adapt(|_inner: Endpoint| Endpoint::respond(StatusCode::FORBIDDEN)))
            .then_func(move |_ctx: Context, _req: Request| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { "unreachable" }
            });

        let res = app.handle(request()).await;
        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
