//! Request dispatch: resolve, select a handler, run the onion.
//!
//! # Data Flow
//! ```text
//! Request
//!     → strip leading '/' → RouterNode::resolve
//!         miss         → root middleware around the 404 handler
//!         fallback     → resolved middleware around no_route
//!         leaf, method → resolved middleware around the view
//!         leaf, other  → resolved middleware around a 405 (Allow: ...)
//!     → Onion::run → Response (+ metrics)
//! ```
//!
//! # Design Decisions
//! - 404 and 405 are ordinary responses, so CORS, security headers and the
//!   access log still apply to them
//! - HEAD falls back to the GET view when none is registered

use std::sync::Arc;
use std::time::Instant;

use axum::http::Method;

use crate::http::{handler_fn, Handler, Request, Response};
use crate::middleware::Onion;
use crate::observability::metrics;
use crate::routing::{RouterNode, Target, ViewSet};

/// Dispatcher behavior switches.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Include panic messages in unclaimed 500 bodies.
    pub expose_errors: bool,
}

/// Entry point from the transport into the routing core.
///
/// Cheap to clone; the router tree is shared read-only.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<RouterNode>,
    not_found: Arc<dyn Handler>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(router: RouterNode, options: DispatchOptions) -> Self {
        Self {
            router: Arc::new(router),
            not_found: handler_fn(|_req: Request| async { Response::not_found() }),
            options,
        }
    }

    /// Replace the handler used when no route matches.
    pub fn with_not_found(mut self, handler: Arc<dyn Handler>) -> Self {
        self.not_found = handler;
        self
    }

    pub fn router(&self) -> &RouterNode {
        &self.router
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    pub async fn dispatch(&self, mut req: Request) -> Response {
        let start = Instant::now();
        let method = req.method.clone();
        let path = req.path().strip_prefix('/').unwrap_or(req.path()).to_string();

        let onion = match self.router.resolve(&path) {
            None => {
                metrics::record_route_miss();
                tracing::debug!(
                    request_id = %req.request_id(),
                    method = %method,
                    path = %req.path(),
                    "No route matched"
                );
                Onion::new(self.router.middleware().to_vec(), self.not_found.clone())
            }
            Some(resolution) => {
                let handler = match resolution.target {
                    Target::Fallback(handler) => handler,
                    Target::Views(views) => select_view(views, &method),
                };
                req.path_params = resolution.params;
                Onion::new(resolution.middleware, handler)
            }
        };

        let response = onion
            .expose_errors(self.options.expose_errors)
            .run(req)
            .await;

        metrics::record_request(method.as_str(), response.status.as_u16(), start);
        response
    }
}

impl Handler for Dispatcher {
    fn call(&self, req: Request) -> futures_util::future::BoxFuture<'static, Response> {
        let dispatcher = self.clone();
        Box::pin(async move { dispatcher.dispatch(req).await })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("options", &self.options)
            .finish()
    }
}

/// The view for `method`, or a 405 handler advertising what is allowed.
fn select_view(views: &ViewSet, method: &Method) -> Arc<dyn Handler> {
    if let Some(handler) = views.handler_for(method) {
        return handler.clone();
    }
    if *method == Method::HEAD {
        if let Some(handler) = views.handler_for(&Method::GET) {
            return handler.clone();
        }
    }

    let mut allowed = views.allowed_methods();
    if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
        allowed.push(Method::HEAD);
    }
    handler_fn(move |_req: Request| {
        let response = Response::method_not_allowed(&allowed);
        async move { response }
    })
}
