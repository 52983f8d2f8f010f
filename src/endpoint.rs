//! The response-writing behavior every middleware and handler produces.
//!
//! # Why a one-shot closure
//!
//! A middleware is invoked with a [`Context`](crate::Context) and a
//! [`Next`](crate::Next) and must hand back *something that will later run
//! against the request*. That something is an [`Endpoint`]:
//!
//! ```text
//! middleware.call(ctx, next)      ← decide what to do, capture ctx + next
//!        ↓ Endpoint
//! endpoint.call(req)              ← run it against this request
//!        ↓ BoxFuture
//! .await → Response
//! ```
//!
//! It is built fresh for every request and consumed by [`Endpoint::call`], so
//! it can own the continuation it captured.

use std::future::Future;
use std::pin::Pin;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A one-shot, type-erased `Request -> Response` behavior.
pub struct Endpoint(Box<dyn FnOnce(Request) -> BoxFuture + Send + 'static>);

impl Endpoint {
    /// Wraps an async closure.
    ///
    /// The closure runs on first poll of the future returned by
    /// [`call`](Endpoint::call), not before. A panic raised while building
    /// the future is therefore raised inside the future, where
    /// [`Recover`](crate::middleware::Recover) can see it.
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        Self(Box::new(move |req| {
            Box::pin(async move { f(req).await.into_response() })
        }))
    }

    /// An endpoint that ignores the request and answers with `res`.
    ///
    /// The usual way to short-circuit: return this instead of calling `next`.
    pub fn respond<R>(res: R) -> Self
    where
        R: IntoResponse + Send + 'static,
    {
        Self::new(move |_req| async move { res })
    }

    pub fn call(self, req: Request) -> BoxFuture {
        (self.0)(req)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Endpoint")
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::StatusCode;

    use super::*;

    fn request() -> Request {
        Request::from(http::Request::builder().uri("/echo").body(Bytes::new()).unwrap())
    }

    #[tokio::test]
    async fn endpoint_receives_request() {
        let ep = Endpoint::new(|req: Request| async move { req.path().to_owned() });
        let res = ep.call(request()).await;
        assert_eq!(res.body_str(), Some("/echo"));
    }

    #[tokio::test]
    async fn respond_ignores_request() {
        let res = Endpoint::respond(StatusCode::FORBIDDEN).call(request()).await;
        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn closure_is_deferred_until_polled() {
        let ep = Endpoint::new(|_req: Request| -> std::future::Ready<Response> {
            panic!("must not run before poll")
        });
        // Building the future must not run the closure.
        drop(ep.call(request()));
    }
}
