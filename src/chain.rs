//! Chain construction and the recursive executor.
//!
//! # How a request moves through the chain
//!
//! ```text
//! ChainHandler::handle(req)
//!        ↓ root context (chain factory → global factory → background)
//! run(0, ctx)   → middleware[0].call(ctx, Next{1}).call(req)
//!        ↓ Next{1}.run(ctx', req)
//! run(1, ctx')  → middleware[1].call(ctx', Next{2}).call(req)
//!        ↓ …
//! run(n, ctxₙ)  → terminal.handle(ctxₙ).call(req)
//! ```
//!
//! The pipeline (middleware list + terminal + root factory) is frozen inside
//! an `Arc` when the chain is bound. A position index is the only per-step
//! state, and it lives in the [`Next`] each middleware owns. The same
//! [`ChainHandler`] can therefore serve any number of requests concurrently.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use tracing::debug;

use crate::context::Context;
use crate::endpoint::BoxFuture;
use crate::error::{BoxError, Error};
use crate::handler::{BoxedHandler, Handler, HandlerFunc};
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::root::{self, RootContextFn};

/// An ordered, immutable list of middleware.
///
/// Build it once at startup, then bind a terminal handler with
/// [`then`](Chain::then) or [`then_func`](Chain::then_func). Each builder
/// method returns `self`, so registrations chain naturally:
///
/// ```rust
/// use tether::{Chain, Context, Request, middleware};
///
/// let app = Chain::new()
///     .with(middleware::recover())
///     .with(middleware::Trace)
///     .then_func(|_ctx: Context, _req: Request| async { "hello" });
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    middlewares: Vec<BoxedMiddleware>,
    root: Option<RootContextFn>,
}

impl Chain {
    /// An empty chain. Bound as-is, the terminal handler runs immediately
    /// with the root context.
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain from already-boxed middleware, in order. See also [`chain!`](crate::chain!).
    pub fn from_middlewares(middlewares: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        Self { middlewares: middlewares.into_iter().collect(), root: None }
    }

    /// Appends `middleware` after everything added so far.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Seeds every request's root context with `factory`, taking precedence
    /// over the process-wide factory.
    pub fn root_context<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Request) -> Context + Send + Sync + 'static,
    {
        self.root = Some(Arc::new(factory));
        self
    }

    /// Number of middleware in the chain.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// `true` if the chain holds no middleware.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Binds `handler` as the terminal handler.
    pub fn then(self, handler: impl Handler) -> ChainHandler {
        self.bind(Some(Arc::new(handler)))
    }

    /// Binds a plain `async fn(Context, Request) -> impl IntoResponse` as the
    /// terminal handler.
    pub fn then_func(self, f: impl HandlerFunc) -> ChainHandler {
        self.bind(Some(f.into_boxed_handler()))
    }

    /// Binds the chain with no terminal handler.
    ///
    /// A request that makes it past the last middleware gets an empty
    /// `200 OK`. Useful for exercising middleware on their own.
    pub fn finish(self) -> ChainHandler {
        self.bind(None)
    }

    fn bind(self, terminal: Option<BoxedHandler>) -> ChainHandler {
        ChainHandler {
            pipeline: Arc::new(Pipeline {
                middlewares: self.middlewares.into(),
                terminal,
                root: self.root,
            }),
        }
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("len", &self.middlewares.len())
            .field("root_context", &self.root.is_some())
            .finish()
    }
}

/// Builds a [`Chain`] from a list of middleware of any mix of types.
///
/// ```rust
/// use tether::{Context, Endpoint, Next, chain, middleware};
///
/// fn noop(ctx: Context, next: Next) -> Endpoint {
///     Endpoint::new(move |req| next.run(ctx, req))
/// }
///
/// let chain = chain![middleware::recover(), noop];
/// assert_eq!(chain.len(), 2);
/// ```
#[macro_export]
macro_rules! chain {
    () => { $crate::Chain::new() };
    ($($mw:expr),+ $(,)?) => {
        $crate::Chain::from_middlewares([
            $(::std::sync::Arc::new($mw) as $crate::middleware::BoxedMiddleware),+
        ])
    };
}

// ── Pipeline / executor ───────────────────────────────────────────────────────

/// The frozen, shareable form of a bound chain.
pub(crate) struct Pipeline {
    middlewares: Arc<[BoxedMiddleware]>,
    terminal: Option<BoxedHandler>,
    root: Option<RootContextFn>,
}

/// Runs the chain from position `index` with `ctx`.
///
/// Lazy: nothing executes until the returned future is first polled, so a
/// panic anywhere downstream surfaces inside the future of whoever awaits it.
pub(crate) fn run(pipeline: Arc<Pipeline>, index: usize, ctx: Context, req: Request) -> BoxFuture {
    Box::pin(async move {
        let endpoint = match pipeline.middlewares.get(index) {
            Some(middleware) => middleware.call(ctx, Next::new(Arc::clone(&pipeline), index + 1)),
            None => match &pipeline.terminal {
                Some(terminal) => terminal.handle(ctx),
                None => {
                    debug!(path = %req.path(), "chain exhausted with no terminal handler");
                    return Response::empty();
                }
            },
        };
        endpoint.call(req).await
    })
}

// ── ChainHandler ──────────────────────────────────────────────────────────────

/// A bound chain: the request-processing entry point.
///
/// Cloning is one atomic increment. Plugs into hyper directly through its
/// [`hyper::service::Service`] impl.
#[derive(Clone)]
pub struct ChainHandler {
    pipeline: Arc<Pipeline>,
}

impl ChainHandler {
    /// Processes one request through the whole chain.
    pub fn handle(&self, req: Request) -> BoxFuture {
        let ctx = root::root_context(self.pipeline.root.as_ref(), &req);
        run(Arc::clone(&self.pipeline), 0, ctx, req)
    }
}

impl std::fmt::Debug for ChainHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainHandler")
            .field("len", &self.pipeline.middlewares.len())
            .field("terminal", &self.pipeline.terminal.is_some())
            .finish()
    }
}

/// Buffers the request body, then runs the chain. A body that fails to read
/// never reaches the chain; hyper gets [`Error::Body`] instead.
impl<B> hyper::service::Service<http::Request<B>> for ChainHandler
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move {
            let req = Request::from_body(req).await?;
            Ok(handler.handle(req).await.into_inner())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::StatusCode;

    use super::*;
    use crate::endpoint::Endpoint;

    fn request() -> Request {
        Request::from(http::Request::builder().uri("/").body(Bytes::new()).unwrap())
    }

    fn tag(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> impl Middleware {
        move |ctx: Context, next: Next| {
            let log = Arc::clone(&log);
            Endpoint::new(move |req: Request| async move {
                log.lock().unwrap().push(format!("before {name}"));
                let res = next.run(ctx, req).await;
                log.lock().unwrap().push(format!("after {name}"));
                res
            })
        }
    }

    #[tokio::test]
    async fn middleware_nest_in_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let terminal_log = Arc::clone(&log);
        let app = Chain::new()
            .with(tag("a", Arc::clone(&log)))
            .with(tag("b", Arc::clone(&log)))
            .then_func(move |_ctx: Context, _req: Request| {
                let log = Arc::clone(&terminal_log);
                async move {
                    log.lock().unwrap().push("terminal".to_owned());
                    "done"
                }
            });

        let res = app.handle(request()).await;
        assert_eq!(res.body_str(), Some("done"));
        assert_eq!(
            *log.lock().unwrap(),
            ["before a", "before b", "terminal", "after b", "after a"],
        );
    }

    #[tokio::test]
    async fn empty_chain_runs_terminal_with_root_context() {
        let app = Chain::new()
            .root_context(|_req: &Request| Context::background().with_value("seed", 7u32))
            .then(|ctx: Context| {
                Endpoint::respond(format!("{}", ctx.value::<u32>("seed").copied().unwrap_or(0)))
            });

        assert_eq!(app.handle(request()).await.body_str(), Some("7"));
    }

    #[tokio::test]
    async fn finish_without_terminal_returns_empty_ok() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let app = Chain::new().with(tag("only", Arc::clone(&log))).finish();

        let res = app.handle(request()).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert!(res.body().is_empty());
        assert_eq!(*log.lock().unwrap(), ["before only", "after only"]);
    }

    #[tokio::test]
    async fn next_resumes_with_exactly_the_given_context() {
        let swap = |_ctx: Context, next: Next| {
            Endpoint::new(move |req: Request| {
                next.run(Context::background().with_value("who", "replacement"), req)
            })
        };
        let app = Chain::new()
            .root_context(|_req: &Request| Context::background().with_value("who", "root"))
            .with(swap)
            .then(|ctx: Context| {
                Endpoint::respond(ctx.value::<&str>("who").copied().unwrap_or("none"))
            });

        assert_eq!(app.handle(request()).await.body_str(), Some("replacement"));
    }

    #[test]
    fn chain_macro_preserves_order_and_len() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain![tag("a", Arc::clone(&log)), tag("b", log)];
        assert_eq!(chain.len(), 2);
        assert!(!chain.is_empty());
        assert!(chain![].is_empty());
    }

    #[tokio::test]
    async fn service_buffers_body_before_running_chain() {
        use hyper::service::Service;

        let app = Chain::new().then_func(|_ctx: Context, req: Request| async move {
            format!("{} bytes", req.body().len())
        });
        let req = http::Request::builder()
            .method("POST")
            .uri("/")
            .body(Full::new(Bytes::from_static(b"payload")))
            .unwrap();

        let res = app.call(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert_eq!(&body[..], b"7 bytes");
    }

    #[tokio::test]
    async fn unreadable_body_is_a_service_error() {
        use http_body_util::StreamBody;
        use hyper::body::Frame;
        use hyper::service::Service;

        let log = Arc::new(Mutex::new(Vec::new()));
        let app = Chain::new()
            .with(tag("outer", Arc::clone(&log)))
            .then_func(|_ctx: Context, _req: Request| async { "unreachable" });
        let chunks: Vec<Result<Frame<Bytes>, std::io::Error>> = vec![
            Ok(Frame::data(Bytes::from_static(b"par"))),
            Err(std::io::Error::other("connection reset")),
        ];
        let req = http::Request::builder()
            .method("POST")
            .uri("/")
            .body(StreamBody::new(futures::stream::iter(chunks)))
            .unwrap();

        let err = app.call(req).await.unwrap_err();
        assert!(matches!(err, Error::Body(_)));
        assert_eq!(err.to_string(), "body: connection reset");
        assert!(log.lock().unwrap().is_empty());
    }
}
