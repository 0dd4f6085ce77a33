//! Request-scoped context: request ID and cancellation.
//!
//! # Design Decisions
//! - Cancellation is a `watch` channel; one handle cancels every clone
//! - The dispatch core propagates the context and never polls it itself

use tokio::sync::watch;

/// Cancels every [`CancellationToken`] created from it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes cancellation of the request (or of the whole server).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever if the handle is dropped first.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a linked handle/token pair.
pub fn cancellation() -> (CancelHandle, CancellationToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancellationToken { rx })
}

/// Context carried by every request through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            request_id: request_id.into(),
            cancel,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), CancellationToken::never())
    }
}
