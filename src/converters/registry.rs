//! Converter registry.
//!
//! # Responsibilities
//! - Map short type names (`int`, `slug`, ...) to converters
//! - Validate fragments on registration
//! - Reject accidental redefinition, allow explicit overwrite

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use crate::converters::{builtin, ConvertError, ConvertFn, Converter, ParamValue};

/// Registration failures. All of these are startup errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("converter `{0}` is already registered (use overwrite to redefine it)")]
    Duplicate(String),

    #[error("converter `{name}` has an invalid regex fragment: {source}")]
    InvalidFragment {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("converter `{name}` must have exactly one capture group, found {found}")]
    CaptureGroups { name: String, found: usize },
}

/// Registry of path converters keyed by type name.
#[derive(Debug, Default)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<Converter>>,
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in converters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for converter in builtin::all() {
            registry
                .converters
                .insert(converter.name().to_string(), Arc::new(converter));
        }
        registry
    }

    /// Register a new converter. Fails if `name` is taken.
    pub fn register<F>(&mut self, name: &str, fragment: &str, to_value: F) -> Result<(), RegistryError>
    where
        F: Fn(&str) -> Result<ParamValue, ConvertError> + Send + Sync + 'static,
    {
        if self.converters.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.insert(name, fragment, Arc::new(to_value))
    }

    /// Register or replace a converter. Last writer wins.
    pub fn overwrite<F>(&mut self, name: &str, fragment: &str, to_value: F) -> Result<(), RegistryError>
    where
        F: Fn(&str) -> Result<ParamValue, ConvertError> + Send + Sync + 'static,
    {
        if self.converters.contains_key(name) {
            tracing::debug!(converter = name, "Overwriting converter");
        }
        self.insert(name, fragment, Arc::new(to_value))
    }

    /// Look up a converter by type name.
    pub fn get(&self, name: &str) -> Option<Arc<Converter>> {
        self.converters.get(name).cloned()
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn insert(&mut self, name: &str, fragment: &str, to_value: ConvertFn) -> Result<(), RegistryError> {
        validate_fragment(name, fragment)?;
        self.converters.insert(
            name.to_string(),
            Arc::new(Converter::new(name, fragment, to_value)),
        );
        Ok(())
    }
}

fn validate_fragment(name: &str, fragment: &str) -> Result<(), RegistryError> {
    let regex = Regex::new(fragment).map_err(|source| RegistryError::InvalidFragment {
        name: name.to_string(),
        source,
    })?;
    // captures_len counts the implicit whole-match group
    let found = regex.captures_len() - 1;
    if found != 1 {
        return Err(RegistryError::CaptureGroups {
            name: name.to_string(),
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(raw: &str) -> Result<ParamValue, ConvertError> {
        Ok(ParamValue::Str(raw.to_uppercase()))
    }

    #[test]
    fn test_builtins_present() {
        let registry = ConverterRegistry::with_builtins();
        for name in ["int", "str", "string", "slug", "uuid", "path", "float", "bool"] {
            assert!(registry.get(name).is_some(), "missing builtin {}", name);
        }
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_register_custom() {
        let mut registry = ConverterRegistry::new();
        registry.register("code", "([A-Z]{3})", upper).unwrap();

        let conv = registry.get("code").unwrap();
        assert_eq!(conv.fragment(), "([A-Z]{3})");
        assert_eq!(conv.convert("abc").unwrap(), ParamValue::Str("ABC".into()));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ConverterRegistry::with_builtins();
        let err = registry.register("int", "([0-9]+)", upper).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(ref n) if n == "int"));
    }

    #[test]
    fn test_overwrite_last_writer_wins() {
        let mut registry = ConverterRegistry::with_builtins();
        registry.overwrite("int", "([0-9]{1,3})", upper).unwrap();
        registry.overwrite("int", "([0-9]{1,4})", upper).unwrap();
        assert_eq!(registry.get("int").unwrap().fragment(), "([0-9]{1,4})");
    }

    #[test]
    fn test_capture_group_count_checked() {
        let mut registry = ConverterRegistry::new();

        let err = registry.register("none", "[a-z]+", upper).unwrap_err();
        assert!(matches!(err, RegistryError::CaptureGroups { found: 0, .. }));

        let err = registry.register("two", "([a-z])([a-z])", upper).unwrap_err();
        assert!(matches!(err, RegistryError::CaptureGroups { found: 2, .. }));

        // non-capturing groups are fine
        registry.register("ok", "((?:ab)+)", upper).unwrap();
    }

    #[test]
    fn test_invalid_fragment() {
        let mut registry = ConverterRegistry::new();
        let err = registry.register("bad", "([a-z]", upper).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidFragment { .. }));
        assert!(err.to_string().contains("bad"));
    }
}
