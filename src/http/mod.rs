//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, body limit)
//!     → request.rs (method, URI, headers, query/body params, context)
//!     → dispatcher.rs (resolve route, pick view, build the onion)
//!     → middleware::Onion (four phases around the handler)
//!     → response.rs (status, payload, headers)
//!     → server.rs (encode payload, read files) → client
//! ```

pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod params;
pub mod request;
pub mod response;
pub mod server;

pub use context::{cancellation, CancelHandle, CancellationToken, RequestContext};
pub use dispatcher::{DispatchOptions, Dispatcher};
pub use handler::{handler_fn, Handler, HandlerFn};
pub use params::{FromParam, ParamError, ParamMap};
pub use request::Request;
pub use response::{IntoResponse, Payload, Response};
pub use server::HttpServer;
