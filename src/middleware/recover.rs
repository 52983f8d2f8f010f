//! Panic recovery.
//!
//! [`Recover`] awaits the rest of the chain inside `catch_unwind`. A panic
//! anywhere downstream (later middleware, the terminal handler, the endpoint
//! they return) is absorbed here and answered with:
//!
//! ```text
//! 500 Internal Server Error
//!
//! Panic:
//! <panic message>
//!
//! <stack trace, at most 4 KiB>
//! ```
//!
//! The stack is the panicking thread's, recorded by a panic hook before the
//! unwind starts, so it names the function that panicked. The hook is
//! installed the first time a `Recover` runs and chains to whatever hook was
//! set before it.
//!
//! The panic does not propagate past this middleware. Without a `Recover`
//! in the chain, a panic unwinds to whatever task is driving the request.
//!
//! Only panics raised while the downstream future is being polled are seen.
//! Work spawned onto other tasks unwinds there.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use futures::FutureExt;
use http::StatusCode;
use tracing::error;

use super::{Middleware, Next};
use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// Upper bound on the stack text written into the response body.
const STACK_LIMIT: usize = 4096;

/// Leading frames that belong to the panic runtime or the hook itself.
const PANIC_MACHINERY: &[&str] = &[
    "tether::middleware::recover::install_panic_hook",
    "<alloc::boxed::Box<",
    "std::backtrace::",
    "std::backtrace_rs::",
    "std::panicking::",
    "std::panic::",
    "core::panicking::",
    "core::panic::",
    "std::sys::backtrace::",
    "std::sys_common::backtrace::",
    "rust_begin_unwind",
    "__rustc::",
];

thread_local! {
    static PANIC_STACK: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: OnceLock<()> = OnceLock::new();

fn install_panic_hook() {
    PANIC_HOOK.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let stack = Backtrace::force_capture().to_string();
            let _ = PANIC_STACK.try_with(|slot| *slot.borrow_mut() = Some(stack));
            previous(info);
        }));
    });
}

fn take_panic_stack() -> Option<String> {
    PANIC_STACK.try_with(|slot| slot.borrow_mut().take()).ok().flatten()
}

/// Middleware that converts a downstream panic into a `500` response.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recover;

/// Shorthand for [`Recover`].
pub fn recover() -> Recover {
    Recover
}

impl Middleware for Recover {
    fn call(&self, ctx: Context, next: Next) -> Endpoint {
        Endpoint::new(move |req: Request| async move {
            install_panic_hook();
            let path = req.path().to_owned();
            match AssertUnwindSafe(next.run(ctx, req)).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => {
                    let recovered = Recovered::capture(payload.as_ref());
                    error!(path = %path, cause = %recovered.cause(), "recovered from panic");
                    recovered.into_response()
                }
            }
        })
    }
}

/// A panic intercepted by [`Recover`]: its message and the stack of the
/// thread that panicked.
#[derive(Debug)]
pub struct Recovered {
    cause: String,
    stack: String,
}

impl Recovered {
    /// Must run on the thread that polled the panicking future, which
    /// `catch_unwind` guarantees.
    fn capture(payload: &(dyn Any + Send)) -> Self {
        // No recorded stack means someone replaced the hook; the
        // interception point is the best left.
        let stack = match take_panic_stack() {
            Some(stack) => skip_panic_machinery(&stack).to_owned(),
            None => Backtrace::force_capture().to_string(),
        };
        Self {
            cause: panic_message(payload),
            stack: truncate(stack, STACK_LIMIT),
        }
    }

    pub fn cause(&self) -> &str { &self.cause }
    pub fn stack(&self) -> &str { &self.stack }
}

impl IntoResponse for Recovered {
    fn into_response(self) -> Response {
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .text(format!("Panic:\n{}\n\n{}", self.cause, self.stack))
    }
}

/// `panic!` payloads are a `&'static str` or a `String` unless someone used
/// `panic_any`.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}

fn skip_panic_machinery(stack: &str) -> &str {
    let mut offset = 0;
    for line in stack.split_inclusive('\n') {
        if let Some(symbol) = frame_symbol(line) {
            if !PANIC_MACHINERY.iter().any(|prefix| symbol.starts_with(prefix)) {
                return &stack[offset..];
            }
        }
        offset += line.len();
    }
    stack
}

/// `"   3: crate::module::function"` → `"crate::module::function"`.
fn frame_symbol(line: &str) -> Option<&str> {
    let (index, symbol) = line.trim_start().split_once(": ")?;
    let numbered = !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit());
    numbered.then(|| symbol.trim_end())
}

fn truncate(mut s: String, limit: usize) -> String {
    if s.len() > limit {
        let mut end = limit;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}
