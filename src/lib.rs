//! Request-dispatch core for HTTP services.
//!
//! Typed path converters, a route tree with a recursive resolver, and a
//! four-phase middleware onion with panic recovery, hosted on axum.

pub mod config;
pub mod converters;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use converters::{ConverterRegistry, ParamValue};
pub use http::{handler_fn, Dispatcher, HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use middleware::Middleware;
pub use routing::{RouterNode, ViewSet};
