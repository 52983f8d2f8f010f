//! # tether
//!
//! Ordered middleware chains with a request-scoped, immutable context.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! tether is not a router and not a framework. It composes a list of
//! middleware and a terminal handler into one request handler, and threads a
//! [`Context`] through them:
//!
//! - Order is fixed when the chain is built and is the same for every request.
//! - Each middleware gets the context and a [`Next`]. Calling `next.run(ctx, req)`
//!   continues the chain with exactly `ctx`; not calling it stops the chain.
//! - Contexts are immutable. A middleware derives a new one with
//!   [`Context::with_value`]; nobody earlier in the chain sees it.
//! - A bound chain holds no per-request state and can serve any number of
//!   requests at once.
//!
//! Transport is hyper's job. A bound [`ChainHandler`] is a
//! [`hyper::service::Service`]; hand it to any hyper connection.
//!
//! ## Quick start
//!
//! ```rust
//! use tether::{Chain, Context, Endpoint, Next, Request, middleware};
//!
//! fn token_a(ctx: Context, next: Next) -> Endpoint {
//!     Endpoint::new(move |req: Request| next.run(ctx.with_value("tokenA", "123"), req))
//! }
//!
//! fn token_b(ctx: Context, next: Next) -> Endpoint {
//!     Endpoint::new(move |req: Request| next.run(ctx.with_value("tokenB", "456"), req))
//! }
//!
//! async fn tokens(ctx: Context, _req: Request) -> String {
//!     let a = ctx.value::<&str>("tokenA").copied().unwrap_or_default();
//!     let b = ctx.value::<&str>("tokenB").copied().unwrap_or_default();
//!     format!("Tokens are: {a}, {b}")
//! }
//!
//! let app = Chain::new()
//!     .with(middleware::recover())
//!     .with(token_a)
//!     .with(token_b)
//!     .then_func(tokens);
//! # let _ = app;
//! ```

mod adapt;
mod chain;
mod context;
mod endpoint;
mod error;
mod handler;
mod request;
mod response;
mod root;

pub mod middleware;

pub use adapt::{Adapted, adapt};
pub use chain::{Chain, ChainHandler};
pub use context::{CancelHandle, Context};
pub use endpoint::{BoxFuture, Endpoint};
pub use error::{BoxError, Error};
pub use handler::{BoxedHandler, Handler, HandlerFunc};
pub use middleware::{Middleware, Next};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use root::{RootContextFn, set_root_context};
