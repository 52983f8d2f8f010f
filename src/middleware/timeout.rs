//! Deadline middleware.
//!
//! Races the rest of the chain against a deadline. The deadline is also put
//! on the context handed downstream, so handlers can check
//! [`Context::is_cancelled`] or await [`Context::cancelled`] and stop early.

use std::fmt;
use std::time::Duration;

use http::StatusCode;
use tokio::time::Instant;
use tracing::warn;

use super::{Middleware, Next};
use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::request::Request;
use crate::response::Response;

/// Answers `504 Gateway Timeout` when the rest of the chain takes longer
/// than the configured duration.
#[derive(Clone)]
pub struct Timeout {
    duration: Duration,
    message: Option<String>,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Self { duration, message: None }
    }

    /// Body of the `504` response. Defaults to `Gateway Timeout`.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Debug for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("duration", &self.duration)
            .finish()
    }
}

impl Middleware for Timeout {
    fn call(&self, ctx: Context, next: Next) -> Endpoint {
        let duration = self.duration;
        let message = self.message.clone();
        Endpoint::new(move |req: Request| async move {
            // A duration too large to represent as an instant means no deadline.
            let Some(deadline) = Instant::now().checked_add(duration) else {
                return next.run(ctx, req).await;
            };
            let ctx = ctx.with_deadline(deadline);
            match tokio::time::timeout_at(deadline, next.run(ctx, req)).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(timeout_ms = duration.as_millis() as u64, "request exceeded deadline");
                    Response::builder()
                        .status(StatusCode::GATEWAY_TIMEOUT)
                        .text(message.unwrap_or_else(|| "Gateway Timeout".to_owned()))
                }
            }
        })
    }
}
