//! Four-phase middleware executor.
//!
//! # Responsibilities
//! - Compose a resolved middleware chain and a handler into one handler
//! - Enforce phase ordering and short-circuit rules
//! - Recover panics from any hook or the handler and route them through the
//!   exception phase
//!
//! # Design Decisions
//! - An explicit loop instead of nested closures: the response phase must
//!   visit every layer, including ones whose request phase never ran
//! - A panic in layer `i` is offered to layers `i..=0`; a handler panic to all
//! - A panic inside `process_exception` counts as "not claimed"
//! - A panic inside `process_response` replaces the response through the same
//!   recovery path, then the remaining outer layers still run

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::http::{Handler, Request, Response};
use crate::middleware::failure::{clear_backtrace, guarded, Failure, Phase};
use crate::middleware::Middleware;
use crate::observability::metrics;

/// Where a failure surfaced, and how many layers (outermost first) may claim it.
type Escalation = (Failure, usize);

/// A handler wrapped by an ordered middleware chain.
///
/// `layers[0]` is the outermost layer.
#[derive(Clone)]
pub struct Onion {
    layers: Arc<[Arc<dyn Middleware>]>,
    handler: Arc<dyn Handler>,
    expose_errors: bool,
}

impl Onion {
    pub fn new(layers: Vec<Arc<dyn Middleware>>, handler: Arc<dyn Handler>) -> Self {
        Self {
            layers: layers.into(),
            handler,
            expose_errors: false,
        }
    }

    /// Include panic messages in unclaimed 500 bodies. Development only.
    pub fn expose_errors(mut self, expose: bool) -> Self {
        self.expose_errors = expose;
        self
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Run the full request → view → handler → exception → response cycle.
    pub async fn run(&self, mut req: Request) -> Response {
        let mut response = match self.inbound(&mut req).await {
            Ok(response) => response,
            Err((failure, depth)) => self.recover(&req, failure, depth),
        };
        self.outbound(&req, &mut response);
        response
    }

    async fn inbound(&self, req: &mut Request) -> Result<Response, Escalation> {
        for (i, layer) in self.layers.iter().enumerate() {
            match guarded(|| layer.process_request(req)) {
                Ok(Some(response)) => {
                    tracing::trace!(layer = layer.name(), "Short-circuited in request phase");
                    return Ok(response);
                }
                Ok(None) => {}
                Err(payload) => {
                    let failure = Failure::from_panic(payload, Phase::Request, Some(i), layer.name());
                    return Err((failure, i + 1));
                }
            }
        }

        for (i, layer) in self.layers.iter().enumerate() {
            match guarded(|| layer.process_view(req)) {
                Ok(Some(response)) => {
                    tracing::trace!(layer = layer.name(), "Short-circuited in view phase");
                    return Ok(response);
                }
                Ok(None) => {}
                Err(payload) => {
                    let failure = Failure::from_panic(payload, Phase::View, Some(i), layer.name());
                    return Err((failure, i + 1));
                }
            }
        }

        let all = self.layers.len();
        let handler_failed =
            |payload| (Failure::from_panic(payload, Phase::Handler, None, "handler"), all);

        // The call itself may panic before a future exists.
        let future = guarded(|| self.handler.call(req.clone()))
            .map_err(handler_failed)?;
        let mut future = AssertUnwindSafe(future).catch_unwind();
        std::future::poll_fn(|cx| {
            clear_backtrace();
            future.poll_unpin(cx)
        })
        .await
        .map_err(handler_failed)
    }

    /// Offer `failure` to `layers[..depth]`, innermost first.
    fn recover(&self, req: &Request, failure: Failure, depth: usize) -> Response {
        metrics::record_panic(failure.phase());
        tracing::error!(
            request_id = %req.request_id(),
            method = %req.method,
            path = %req.path(),
            phase = %failure.phase(),
            origin = failure.origin(),
            message = %failure.message(),
            "Recovered panic"
        );
        if let Some(backtrace) = failure.backtrace() {
            tracing::debug!(backtrace = %backtrace, "Panic backtrace");
        }

        for i in (0..depth).rev() {
            let layer = &self.layers[i];
            match guarded(|| layer.process_exception(req, &failure)) {
                Ok(Some(response)) => {
                    tracing::debug!(layer = layer.name(), "Exception claimed");
                    return response;
                }
                Ok(None) => {}
                Err(payload) => {
                    let nested = Failure::from_panic(payload, Phase::Exception, Some(i), layer.name());
                    metrics::record_panic(nested.phase());
                    tracing::error!(
                        request_id = %req.request_id(),
                        layer = layer.name(),
                        message = %nested.message(),
                        "Panic while handling exception"
                    );
                }
            }
        }

        failure.to_response(self.expose_errors)
    }

    fn outbound(&self, req: &Request, response: &mut Response) {
        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            let outcome = guarded(|| layer.process_response(req, response));
            if let Err(payload) = outcome {
                let failure = Failure::from_panic(payload, Phase::Response, Some(i), layer.name());
                *response = self.recover(req, failure, i + 1);
            }
        }
    }
}

impl Handler for Onion {
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        let onion = self.clone();
        Box::pin(async move { onion.run(req).await })
    }
}

impl std::fmt::Debug for Onion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.layers.iter().map(|l| l.name()).collect();
        f.debug_struct("Onion")
            .field("layers", &names)
            .field("expose_errors", &self.expose_errors)
            .finish()
    }
}
