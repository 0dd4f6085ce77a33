//! Per-request access log.
//!
//! Starts a timer in the request phase and emits one event in the response
//! phase. Bind it outermost so short-circuits by other layers are timed too.

use std::time::{Duration, Instant};

use crate::http::{Request, Response};
use crate::middleware::Middleware;

/// Request start time, stored in the request extensions.
#[derive(Debug, Clone, Copy)]
pub struct StartedAt(pub Instant);

impl StartedAt {
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

#[derive(Debug, Default)]
pub struct AccessLogMiddleware;

impl AccessLogMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn process_request(&self, req: &mut Request) -> Option<Response> {
        req.extensions.insert(StartedAt(Instant::now()));
        None
    }

    fn process_response(&self, req: &Request, response: &mut Response) {
        let elapsed_ms = req
            .extensions
            .get::<StartedAt>()
            .map(|started| started.elapsed().as_secs_f64() * 1000.0);
        let status = response.status.as_u16();

        if response.status.is_server_error() {
            tracing::warn!(
                request_id = %req.request_id(),
                method = %req.method,
                path = %req.path(),
                status,
                elapsed_ms = ?elapsed_ms,
                "Request failed"
            );
        } else {
            tracing::info!(
                request_id = %req.request_id(),
                method = %req.method,
                path = %req.path(),
                status,
                elapsed_ms = ?elapsed_ms,
                "Request completed"
            );
        }
    }
}
