//! Recovered panics.
//!
//! # Responsibilities
//! - Turn a caught unwind payload into a `Failure` value
//! - Record where in the pipeline it happened
//! - Optionally capture the panic-site backtrace for operators
//! - Synthesize the default 500 response
//!
//! # Design Decisions
//! - Client bodies never include panic details unless explicitly enabled
//! - The backtrace is stashed by a panic hook in a thread-local and picked up
//!   by the boundary that catches the unwind on the same thread. Every
//!   boundary empties the slot first, so a backtrace left by a panic caught
//!   elsewhere never attaches to an unrelated failure

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Once;

use axum::http::StatusCode;

use crate::http::Response;

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Pipeline stage in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Request,
    View,
    Handler,
    Exception,
    Response,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Request => "request",
            Phase::View => "view",
            Phase::Handler => "handler",
            Phase::Exception => "exception",
            Phase::Response => "response",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A panic recovered inside the onion.
#[derive(Debug, Clone)]
pub struct Failure {
    message: String,
    phase: Phase,
    /// Index into the middleware chain; `None` for the handler.
    layer: Option<usize>,
    origin: &'static str,
    backtrace: Option<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>, phase: Phase, layer: Option<usize>, origin: &'static str) -> Self {
        Self {
            message: message.into(),
            phase,
            layer,
            origin,
            backtrace: None,
        }
    }

    /// Build from a `catch_unwind` payload.
    pub fn from_panic(
        payload: Box<dyn Any + Send>,
        phase: Phase,
        layer: Option<usize>,
        origin: &'static str,
    ) -> Self {
        let message = panic_message(payload.as_ref());
        let mut failure = Self::new(message, phase, layer, origin);
        failure.backtrace = LAST_BACKTRACE.with(|slot| slot.borrow_mut().take());
        failure
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn layer(&self) -> Option<usize> {
        self.layer
    }

    pub fn origin(&self) -> &'static str {
        self.origin
    }

    pub fn backtrace(&self) -> Option<&str> {
        self.backtrace.as_deref()
    }

    /// Default response when no middleware claims the failure.
    pub fn to_response(&self, expose_details: bool) -> Response {
        let mut body = serde_json::json!({
            "error": "internal_server_error",
            "message": "Internal Server Error",
        });
        if expose_details {
            body["detail"] = serde_json::json!({
                "panic": self.message,
                "phase": self.phase.as_str(),
                "origin": self.origin,
            });
        }
        Response::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_payload(crate::http::Payload::Json(body))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic in {} phase ({}): {}", self.phase, self.origin, self.message)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// `catch_unwind` starting from an empty backtrace slot.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    clear_backtrace();
    catch_unwind(AssertUnwindSafe(f))
}

pub(crate) fn clear_backtrace() {
    LAST_BACKTRACE.with(|slot| slot.borrow_mut().take());
}

#[cfg(test)]
pub(crate) fn stash_backtrace(backtrace: &str) {
    LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace.to_string()));
}

/// Route panic reports through `tracing` and stash backtraces for `Failure`.
///
/// Idempotent. Call once at startup, before serving.
pub fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let backtrace = Backtrace::force_capture().to_string();
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));

            let location = info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_else(|| "unknown".to_string());
            tracing::error!(
                location = %location,
                message = %panic_message(info.payload()),
                "Panic"
            );
        }));
    });
}
