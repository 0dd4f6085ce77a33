//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Reject header values the middleware could not emit
//! - Reject unsafe combinations (credentials with a wildcard origin)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderValue, Method};

use crate::config::schema::ServerConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("observability.log_level: unknown level {0:?}")]
    InvalidLogLevel(String),

    #[error("{field}: not a valid header value {value:?}")]
    InvalidHeaderValue { field: &'static str, value: String },

    #[error("security_headers.frame_options must be DENY or SAMEORIGIN, got {0:?}")]
    InvalidFrameOptions(String),

    #[error("cors.allow_methods: invalid method {0:?}")]
    InvalidMethod(String),

    #[error("cors: allow_credentials cannot be combined with a wildcard origin")]
    CredentialsWithWildcard,

    #[error("auth: enabled without any tokens")]
    NoTokens,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::InvalidLogLevel(obs.log_level.clone()));
    }
    if obs.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &obs.metrics_address);
    }

    let headers = &config.security_headers;
    if headers.enabled {
        let frame = headers.frame_options.to_ascii_uppercase();
        if frame != "DENY" && frame != "SAMEORIGIN" {
            errors.push(ValidationError::InvalidFrameOptions(headers.frame_options.clone()));
        }
        check_header(&mut errors, "security_headers.referrer_policy", &headers.referrer_policy);
        if let Some(csp) = &headers.content_security_policy {
            check_header(&mut errors, "security_headers.content_security_policy", csp);
        }
    }

    let cors = &config.cors;
    if cors.enabled {
        for method in &cors.allow_methods {
            if Method::from_bytes(method.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod(method.clone()));
            }
        }
        for origin in &cors.allow_origins {
            check_header(&mut errors, "cors.allow_origins", origin);
        }
        for name in &cors.allow_headers {
            check_header(&mut errors, "cors.allow_headers", name);
        }
        if cors.allow_credentials && cors.allow_origins.iter().any(|o| o == "*") {
            errors.push(ValidationError::CredentialsWithWildcard);
        }
    }

    let auth = &config.auth;
    if auth.enabled {
        if auth.tokens.is_empty() {
            errors.push(ValidationError::NoTokens);
        }
        check_header(&mut errors, "auth.realm", &auth.realm);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_header(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if HeaderValue::from_str(value).is_err() {
        errors.push(ValidationError::InvalidHeaderValue {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.timeouts.request_secs = 0;
        config.observability.log_level = "loud".to_string();
        config.security_headers.frame_options = "ALLOWALL".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero("timeouts.request_secs")));
        assert!(errors.contains(&ValidationError::InvalidLogLevel("loud".to_string())));
    }

    #[test]
    fn test_cors_credentials_with_wildcard() {
        let mut config = ServerConfig::default();
        config.cors.enabled = true;
        config.cors.allow_credentials = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::CredentialsWithWildcard]);

        // disabled sections are not checked
        config.cors.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_auth_requires_tokens() {
        let mut config = ServerConfig::default();
        config.auth.enabled = true;
        assert_eq!(validate_config(&config).unwrap_err(), vec![ValidationError::NoTokens]);

        config.auth.tokens = vec!["ops:t0k".to_string()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "nowhere".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
