//! Per-request tracing span.

use std::time::Instant;

use tracing::{Instrument, info, info_span};

use super::{Middleware, Next};
use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::request::Request;

/// Opens a `request` span with method and path, and logs status and latency
/// once the rest of the chain has answered.
///
/// Put it first so the span covers every later middleware.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn call(&self, ctx: Context, next: Next) -> Endpoint {
        Endpoint::new(move |req: Request| {
            let span = info_span!("request", method = %req.method(), path = %req.path());
            async move {
                let started = Instant::now();
                let res = next.run(ctx, req).await;
                info!(
                    status = res.status_code().as_u16(),
                    latency_us = started.elapsed().as_micros() as u64,
                    "request completed"
                );
                res
            }
            .instrument(span)
        })
    }
}
