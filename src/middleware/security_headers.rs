//! Security response headers.

use axum::http::{header, HeaderName, HeaderValue};

use crate::config::SecurityHeadersConfig;
use crate::http::{Request, Response};
use crate::middleware::Middleware;

/// Adds hardening headers to every response, leaving handler-set values alone.
pub struct SecurityHeadersMiddleware {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeadersMiddleware {
    pub fn new(config: &SecurityHeadersConfig) -> Self {
        let mut headers = vec![
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
            (
                HeaderName::from_static("cross-origin-opener-policy"),
                HeaderValue::from_static("same-origin"),
            ),
        ];

        let frame = if config.frame_options.eq_ignore_ascii_case("SAMEORIGIN") {
            "SAMEORIGIN"
        } else {
            "DENY"
        };
        headers.push((header::X_FRAME_OPTIONS, HeaderValue::from_static(frame)));

        if let Ok(value) = HeaderValue::from_str(&config.referrer_policy) {
            headers.push((header::REFERRER_POLICY, value));
        }
        if config.hsts_max_age_secs > 0 {
            let hsts = format!("max-age={}; includeSubDomains", config.hsts_max_age_secs);
            if let Ok(value) = HeaderValue::from_str(&hsts) {
                headers.push((header::STRICT_TRANSPORT_SECURITY, value));
            }
        }
        if let Some(csp) = &config.content_security_policy {
            if let Ok(value) = HeaderValue::from_str(csp) {
                headers.push((header::CONTENT_SECURITY_POLICY, value));
            }
        }

        Self { headers }
    }

    pub fn header_names(&self) -> impl Iterator<Item = &HeaderName> {
        self.headers.iter().map(|(name, _)| name)
    }
}

impl Default for SecurityHeadersMiddleware {
    fn default() -> Self {
        Self::new(&SecurityHeadersConfig::default())
    }
}

impl Middleware for SecurityHeadersMiddleware {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    fn process_response(&self, _req: &Request, response: &mut Response) {
        for (name, value) in &self.headers {
            if !response.headers.contains_key(name) {
                response.headers.insert(name.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Uri};

    fn apply(mw: &SecurityHeadersMiddleware, mut response: Response) -> Response {
        let req = Request::new(Method::GET, Uri::from_static("/"));
        mw.process_response(&req, &mut response);
        response
    }

    #[test]
    fn test_defaults() {
        let resp = apply(&SecurityHeadersMiddleware::default(), Response::ok());
        assert_eq!(resp.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(resp.headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(resp.headers[header::REFERRER_POLICY], "same-origin");
        assert!(!resp.headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
        assert!(!resp.headers.contains_key(header::CONTENT_SECURITY_POLICY));
    }

    #[test]
    fn test_configured_values() {
        let mw = SecurityHeadersMiddleware::new(&SecurityHeadersConfig {
            hsts_max_age_secs: 31_536_000,
            frame_options: "sameorigin".to_string(),
            content_security_policy: Some("default-src 'self'".to_string()),
            ..SecurityHeadersConfig::default()
        });
        let resp = apply(&mw, Response::ok());
        assert_eq!(
            resp.headers[header::STRICT_TRANSPORT_SECURITY],
            "max-age=31536000; includeSubDomains"
        );
        assert_eq!(resp.headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
        assert_eq!(resp.headers[header::CONTENT_SECURITY_POLICY], "default-src 'self'");
    }

    #[test]
    fn test_handler_values_win() {
        let resp = Response::ok().with_header(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        );
        let resp = apply(&SecurityHeadersMiddleware::default(), resp);
        assert_eq!(resp.headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
    }
}
