//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build router → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → trigger() → server stops accepting
//!         → in-flight request contexts cancelled → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Routes are registered before the listener is bound
//! - Shutdown has a grace period: forced exit after the deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::{notified, Shutdown};
pub use signals::wait_for_signal;
