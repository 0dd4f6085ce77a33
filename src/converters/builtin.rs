//! Built-in converters: `int`, `str`/`string`, `slug`, `uuid`, `path`, `float`, `bool`.

use std::sync::Arc;

use uuid::Uuid;

use crate::converters::{ConvertError, Converter, ParamValue};

pub const INT: &str = "([0-9]+)";
pub const STR: &str = "([^/]+)";
pub const SLUG: &str = "([-a-zA-Z0-9_]+)";
pub const UUID: &str =
    "([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})";
pub const PATH: &str = "(.+)";
pub const FLOAT: &str = "([0-9]+(?:\\.[0-9]+)?)";
pub const BOOL: &str = "(true|false|1|0)";

/// Every built-in converter.
pub fn all() -> Vec<Converter> {
    vec![
        Converter::new("int", INT, Arc::new(to_int)),
        Converter::new("str", STR, Arc::new(to_str)),
        Converter::new("string", STR, Arc::new(to_str)),
        Converter::new("slug", SLUG, Arc::new(to_str)),
        Converter::new("uuid", UUID, Arc::new(to_uuid)),
        Converter::new("path", PATH, Arc::new(to_str)),
        Converter::new("float", FLOAT, Arc::new(to_float)),
        Converter::new("bool", BOOL, Arc::new(to_bool)),
    ]
}

fn to_int(raw: &str) -> Result<ParamValue, ConvertError> {
    raw.parse::<i64>()
        .map(ParamValue::Int)
        .map_err(|e| ConvertError(format!("invalid integer {:?}: {}", raw, e)))
}

fn to_str(raw: &str) -> Result<ParamValue, ConvertError> {
    Ok(ParamValue::Str(raw.to_string()))
}

fn to_uuid(raw: &str) -> Result<ParamValue, ConvertError> {
    Uuid::parse_str(raw)
        .map(ParamValue::Uuid)
        .map_err(|e| ConvertError(format!("invalid uuid {:?}: {}", raw, e)))
}

fn to_float(raw: &str) -> Result<ParamValue, ConvertError> {
    raw.parse::<f64>()
        .map(ParamValue::Float)
        .map_err(|e| ConvertError(format!("invalid float {:?}: {}", raw, e)))
}

fn to_bool(raw: &str) -> Result<ParamValue, ConvertError> {
    match raw {
        "true" | "1" => Ok(ParamValue::Bool(true)),
        "false" | "0" => Ok(ParamValue::Bool(false)),
        other => Err(ConvertError(format!("invalid bool {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_overflow_is_conversion_failure() {
        assert_eq!(to_int("42").unwrap(), ParamValue::Int(42));
        assert!(to_int("99999999999999999999999").is_err());
    }

    #[test]
    fn test_uuid_conversion() {
        let raw = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let value = to_uuid(raw).unwrap();
        assert_eq!(value, ParamValue::Uuid(Uuid::parse_str(raw).unwrap()));
    }

    #[test]
    fn test_bool_and_float() {
        assert_eq!(to_bool("1").unwrap(), ParamValue::Bool(true));
        assert_eq!(to_bool("false").unwrap(), ParamValue::Bool(false));
        assert_eq!(to_float("2.5").unwrap(), ParamValue::Float(2.5));
    }
}
