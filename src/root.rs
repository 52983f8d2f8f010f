//! Root-context factories.
//!
//! Every request starts from one root [`Context`]. Where it comes from, in
//! order of precedence:
//!
//! 1. the factory set on the chain with [`Chain::root_context`](crate::Chain::root_context)
//! 2. the process-wide factory installed with [`set_root_context`]
//! 3. [`Context::background`]
//!
//! The process-wide slot is write-once. Install it during startup, before
//! the first request is served; a second install is rejected instead of
//! racing with live traffic.

use std::sync::{Arc, OnceLock};

use crate::context::Context;
use crate::error::Error;
use crate::request::Request;

/// Builds the root context for one request.
pub type RootContextFn = Arc<dyn Fn(&Request) -> Context + Send + Sync>;

static ROOT_CONTEXT: OnceLock<RootContextFn> = OnceLock::new();

/// Installs the process-wide root-context factory.
///
/// # Errors
///
/// [`Error::RootContextAlreadySet`] if a factory was installed before.
///
/// ```rust
/// use tether::{Context, Request};
///
/// tether::set_root_context(|req: &Request| {
///     Context::background().with_value("path", req.path().to_owned())
/// })
/// .expect("root context installed twice");
/// ```
pub fn set_root_context<F>(f: F) -> Result<(), Error>
where
    F: Fn(&Request) -> Context + Send + Sync + 'static,
{
    ROOT_CONTEXT
        .set(Arc::new(f))
        .map_err(|_| Error::RootContextAlreadySet)
}

pub(crate) fn root_context(local: Option<&RootContextFn>, req: &Request) -> Context {
    match local.or_else(|| ROOT_CONTEXT.get()) {
        Some(factory) => factory(req),
        None => Context::background(),
    }
}
