//! Parameter namespaces (path, query, body) and typed extraction.
//!
//! # Design Decisions
//! - Multi-valued and insertion-ordered; `get` reads the last value
//! - Keys are hashed, so building a namespace from a large body stays linear
//! - Extraction failures are values (`ParamError`), never panics

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::converters::ParamValue;

/// Typed extraction failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("missing required parameter `{name}`")]
    Missing { name: String },

    #[error("parameter `{name}` must be {expected}, got {found:?}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: String,
    },
}

impl ParamError {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ParamError::Missing { .. } => "missing_param",
            ParamError::TypeMismatch { .. } => "type_mismatch",
        }
    }
}

/// Conversion from a stored parameter value into a Rust type.
///
/// Query and form values arrive as strings, so numeric and boolean
/// impls also accept their textual form.
pub trait FromParam: Sized {
    const EXPECTED: &'static str;

    fn from_param(value: &ParamValue) -> Option<Self>;
}

macro_rules! int_from_param {
    ($($ty:ty),*) => {
        $(
            impl FromParam for $ty {
                const EXPECTED: &'static str = "an integer";

                fn from_param(value: &ParamValue) -> Option<Self> {
                    match value {
                        ParamValue::Int(v) => <$ty>::try_from(*v).ok(),
                        ParamValue::Str(s) => s.parse().ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

int_from_param!(i64, i32, u32, u64, usize);

impl FromParam for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Str(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromParam for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Bool(v) => Some(*v),
            ParamValue::Str(s) => match s.as_str() {
                "true" | "1" | "on" | "yes" => Some(true),
                "false" | "0" | "off" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromParam for Uuid {
    const EXPECTED: &'static str = "a uuid";

    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Uuid(v) => Some(*v),
            ParamValue::Str(s) => Uuid::parse_str(s).ok(),
            _ => None,
        }
    }
}

impl FromParam for String {
    const EXPECTED: &'static str = "a string";

    fn from_param(value: &ParamValue) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FromParam for ParamValue {
    const EXPECTED: &'static str = "a value";

    fn from_param(value: &ParamValue) -> Option<Self> {
        Some(value.clone())
    }
}

/// Ordered multi-valued map from parameter name to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    entries: IndexMap<String, Vec<ParamValue>>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    /// Replace every value under `key`. The key moves to the end.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        self.entries.shift_remove(&key);
        self.entries.insert(key, vec![value.into()]);
    }

    /// Last value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&ParamValue> {
        self.get_all(key).last()
    }

    pub fn get_all(&self, key: &str) -> &[ParamValue] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(key, last value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries
            .iter()
            .filter_map(|(k, values)| values.last().map(|v| (k.as_str(), v)))
    }

    /// Typed extraction of the last value under `key`.
    pub fn get<T: FromParam>(&self, key: &str) -> Result<T, ParamError> {
        let value = self.value(key).ok_or_else(|| ParamError::Missing {
            name: key.to_string(),
        })?;
        convert(key, value)
    }

    /// Like `get`, but an absent key is `Ok(None)`.
    pub fn get_opt<T: FromParam>(&self, key: &str) -> Result<Option<T>, ParamError> {
        self.value(key).map(|value| convert(key, value)).transpose()
    }

    /// Typed extraction of every value under `key`, e.g. repeated query keys.
    pub fn get_vec<T: FromParam>(&self, key: &str) -> Result<Vec<T>, ParamError> {
        self.get_all(key)
            .iter()
            .map(|value| convert(key, value))
            .collect()
    }
}

fn convert<T: FromParam>(key: &str, value: &ParamValue) -> Result<T, ParamError> {
    T::from_param(value).ok_or_else(|| ParamError::TypeMismatch {
        name: key.to_string(),
        expected: T::EXPECTED,
        found: value.to_string(),
    })
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParamMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl fmt::Display for ParamMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}
