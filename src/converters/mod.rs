//! Path segment converters.
//!
//! # Data Flow
//! ```text
//! Application bootstrap
//!     → registry.rs (register built-in and custom converters)
//!     → Arc<ConverterRegistry> handed to the router root
//!     → routing::pattern looks converters up by type name
//!
//! Request time:
//!     raw captured segment → Converter::convert → ParamValue
//! ```
//!
//! # Design Decisions
//! - Registry is an explicit object, never a process-wide global
//! - Registration completes before the router is built; read-only afterwards
//! - Duplicate names are rejected; `overwrite` is the explicit escape hatch
//! - Each fragment carries exactly one capture group (checked on registration)
//! - Only `path` matches `/` among the built-ins

pub mod builtin;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

pub use registry::{ConverterRegistry, RegistryError};

/// A typed value produced by a converter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    Str(String),
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, used in type mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Bool(_) => "bool",
            ParamValue::Uuid(_) => "uuid",
            ParamValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Uuid(v) => write!(f, "{}", v),
            ParamValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// A converter rejected a captured segment.
///
/// Not fatal to the request: the route simply does not apply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ConvertError(pub String);

/// String-to-value conversion function of a converter.
pub type ConvertFn = Arc<dyn Fn(&str) -> Result<ParamValue, ConvertError> + Send + Sync>;

/// A named regex fragment plus its conversion function.
#[derive(Clone)]
pub struct Converter {
    name: String,
    fragment: String,
    to_value: ConvertFn,
}

impl Converter {
    pub fn new(name: impl Into<String>, fragment: impl Into<String>, to_value: ConvertFn) -> Self {
        Self {
            name: name.into(),
            fragment: fragment.into(),
            to_value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Regex fragment with exactly one capture group.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn convert(&self, raw: &str) -> Result<ParamValue, ConvertError> {
        (self.to_value)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("fragment", &self.fragment)
            .finish_non_exhaustive()
    }
}
