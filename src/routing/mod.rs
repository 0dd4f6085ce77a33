//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (at startup):
//!     RouterNode::root(registry)
//!     → include()/path() per template
//!     → pattern.rs compiles `<type:name>` placeholders into anchored regexes
//!     → sibling collision check
//!     → tree frozen behind Arc once serving starts
//!
//! Incoming request path:
//!     → resolver.rs walks the tree, stripping matched prefixes
//!     → converters turn captures into typed values
//!     → Return: view set (or fallback), middleware root-to-leaf, params
//!     → or explicit no-match
//! ```
//!
//! # Design Decisions
//! - Registration order is routing priority (first match wins)
//! - Leaves anchor `^...$`, internal nodes anchor `^...` and hand the
//!   remainder of the path to their children
//! - Configuration mistakes are `RouteError`s at startup, never request-time failures
//! - A miss is `None`, not an error

pub mod node;
pub mod pattern;
pub mod resolver;

use thiserror::Error;

pub use node::{RouteInfo, RouterNode, ViewSet};
pub use pattern::{CompiledPattern, NodeKind, ParamInfo};
pub use resolver::{Resolution, Target};

/// Route registration failures.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("unknown converter type `{converter}` in route `{template}`")]
    UnknownConverter { template: String, converter: String },

    #[error("route `{template}` does not compile: {source}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },

    #[error("route `{template}` collides with sibling route `{existing}`")]
    Collision { existing: String, template: String },

    #[error("route `{template}` has no handlers")]
    EmptyViewSet { template: String },

    #[error("cannot register `{template}` under leaf route `{parent}`")]
    LeafParent { parent: String, template: String },
}
