//! Bearer token authentication.
//!
//! # Responsibilities
//! - Reject requests without a known `Authorization: Bearer` token (401)
//! - Record the authenticated `Principal` in the request extensions
//!
//! # Design Decisions
//! - Token issuance and verification of signed tokens live elsewhere; this
//!   layer only checks against a static table
//! - CORS preflights pass through unauthenticated

use std::collections::HashMap;

use axum::http::{header, HeaderValue, Method, StatusCode};

use crate::config::AuthConfig;
use crate::http::{Request, Response};
use crate::middleware::Middleware;

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
}

pub struct BearerAuthMiddleware {
    /// token → principal name
    tokens: HashMap<String, String>,
    challenge: HeaderValue,
}

impl BearerAuthMiddleware {
    /// Tokens are `name:token` pairs; a bare token gets a generated name.
    pub fn new(config: &AuthConfig) -> Self {
        let tokens = config
            .tokens
            .iter()
            .enumerate()
            .map(|(i, entry)| match entry.split_once(':') {
                Some((name, token)) => (token.to_string(), name.to_string()),
                None => (entry.clone(), format!("token-{}", i)),
            })
            .collect();
        Self {
            tokens,
            challenge: challenge(&config.realm),
        }
    }

    pub fn with_token(mut self, name: impl Into<String>, token: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), name.into());
        self
    }

    fn authenticate(&self, req: &Request) -> Result<Principal, &'static str> {
        let value = req.header(header::AUTHORIZATION).ok_or("missing credentials")?;
        let (scheme, token) = value.split_once(' ').ok_or("malformed authorization header")?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err("unsupported authorization scheme");
        }
        self.tokens
            .get(token.trim())
            .map(|name| Principal { name: name.clone() })
            .ok_or("invalid token")
    }
}

fn challenge(realm: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer realm=\"{}\"", realm))
        .unwrap_or_else(|_| HeaderValue::from_static("Bearer"))
}

impl Middleware for BearerAuthMiddleware {
    fn name(&self) -> &'static str {
        "bearer_auth"
    }

    fn process_request(&self, req: &mut Request) -> Option<Response> {
        if req.method == Method::OPTIONS {
            return None;
        }
        match self.authenticate(req) {
            Ok(principal) => {
                tracing::debug!(request_id = %req.request_id(), principal = %principal.name, "Authenticated");
                req.extensions.insert(principal);
                None
            }
            Err(reason) => {
                tracing::debug!(request_id = %req.request_id(), reason, "Authentication failed");
                Some(
                    Response::error(StatusCode::UNAUTHORIZED, "unauthorized", reason)
                        .with_header(header::WWW_AUTHENTICATE, self.challenge.clone()),
                )
            }
        }
    }
}
