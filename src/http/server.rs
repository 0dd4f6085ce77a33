//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: one fallback that feeds the dispatcher
//! - Wire up transport middleware (timeout, request ID, tracing)
//! - Buffer request bodies up to the configured limit
//! - Convert `Response` payloads to wire bodies, reading `File` payloads
//! - Cancel in-flight request contexts on graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::context::{cancellation, CancelHandle, RequestContext};
use crate::http::dispatcher::Dispatcher;
use crate::http::request::Request;
use crate::http::response::{guess_content_type, Encoded, Response};
use crate::lifecycle::notified;

const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into the fallback handler.
#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
    max_body_bytes: usize,
    cancel: Arc<CancelHandle>,
}

/// HTTP server hosting a [`Dispatcher`].
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    cancel: Arc<CancelHandle>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        let (handle, _) = cancellation();
        let cancel = Arc::new(handle);
        let state = AppState {
            dispatcher,
            max_body_bytes: config.limits.max_body_bytes,
            cancel: cancel.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            cancel,
        }
    }

    /// Build the Axum router with all transport layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let cancel = self.cancel.clone();
        let signal = async move {
            notified(shutdown).await;
            tracing::info!("Shutdown signal received, draining connections");
            cancel.cancel();
        };

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The fully layered Axum router, for in-process testing.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Buffer the body, build the core `Request`, dispatch, encode.
async fn dispatch_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> axum::response::Response {
    let (parts, body) = request.into_parts();

    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                limit = state.max_body_bytes,
                error = %e,
                "Rejected request body"
            );
            let response = Response::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                format!("Request body exceeds {} bytes", state.max_body_bytes),
            );
            return into_wire(response).await;
        }
    };

    let context = RequestContext::new(request_id, state.cancel.token());
    let request = Request::from_parts(parts, body, context);
    let response = state.dispatcher.dispatch(request).await;
    into_wire(response).await
}

async fn into_wire(response: Response) -> axum::response::Response {
    let Response {
        status,
        payload,
        mut headers,
    } = response;

    match payload.encode(&mut headers) {
        Encoded::Body(bytes) => assemble(status, headers, Body::from(bytes)),
        Encoded::File(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => {
                if !headers.contains_key(header::CONTENT_TYPE) {
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(guess_content_type(&path)),
                    );
                }
                assemble(status, headers, Body::from(bytes))
            }
            Err(e) => {
                let fallback = if e.kind() == std::io::ErrorKind::NotFound {
                    Response::not_found()
                } else {
                    tracing::error!(path = %path.display(), error = %e, "Failed to read file payload");
                    Response::error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "file_error",
                        "File could not be read",
                    )
                };
                let Response {
                    status,
                    payload,
                    mut headers,
                } = fallback;
                match payload.encode(&mut headers) {
                    Encoded::Body(bytes) => assemble(status, headers, Body::from(bytes)),
                    Encoded::File(_) => assemble(status, headers, Body::empty()),
                }
            }
        },
    }
}

fn assemble(status: StatusCode, headers: HeaderMap, body: Body) -> axum::response::Response {
    let mut response = axum::response::Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
