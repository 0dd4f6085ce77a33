//! Middleware subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved chain [A (root) .. C (leaf)] + handler
//!     → onion.rs composes one handler
//!         A.req → B.req → C.req          (short-circuit stops here)
//!         A.view → B.view → C.view       (short-circuit stops here)
//!         handler
//!         [panic] C.exc → B.exc → A.exc  (first claim wins, else 500)
//!         C.resp → B.resp → A.resp       (always, every layer)
//! ```
//!
//! # Design Decisions
//! - Four synchronous hooks with no-op defaults; implement only what you need
//! - Every hook and the handler run behind an unwind boundary
//! - Failures travel as values (`Failure`), never re-thrown
//! - The response phase is unconditional, including for layers whose
//!   request phase never ran

pub mod access_log;
pub mod auth;
pub mod cors;
pub mod failure;
pub mod onion;
pub mod security_headers;

use crate::http::{Request, Response};

pub use access_log::AccessLogMiddleware;
pub use auth::{BearerAuthMiddleware, Principal};
pub use cors::CorsMiddleware;
pub use failure::{install_panic_hook, Failure, Phase};
pub use onion::Onion;
pub use security_headers::SecurityHeadersMiddleware;

/// Cross-cutting behavior wrapped around a handler.
///
/// Returning `Some` from `process_request` or `process_view` short-circuits;
/// returning `Some` from `process_exception` claims the failure.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs and failure reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn process_request(&self, _req: &mut Request) -> Option<Response> {
        None
    }

    fn process_view(&self, _req: &mut Request) -> Option<Response> {
        None
    }

    fn process_exception(&self, _req: &Request, _failure: &Failure) -> Option<Response> {
        None
    }

    fn process_response(&self, _req: &Request, _response: &mut Response) {}
}
