//! Cross-origin resource sharing.
//!
//! Preflight requests (`OPTIONS` with `Access-Control-Request-Method`) are
//! answered in the request phase; every other response from an allowed
//! origin gets its CORS headers in the response phase.

use axum::http::{header, HeaderValue, Method, StatusCode};

use crate::config::CorsConfig;
use crate::http::{Request, Response};
use crate::middleware::Middleware;

pub struct CorsMiddleware {
    origins: Vec<String>,
    any_origin: bool,
    methods: HeaderValue,
    headers: HeaderValue,
    credentials: bool,
    max_age: Option<HeaderValue>,
}

impl CorsMiddleware {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            origins: config.allow_origins.clone(),
            any_origin: config.allow_origins.iter().any(|o| o == "*"),
            methods: join_header(&config.allow_methods),
            headers: join_header(&config.allow_headers),
            credentials: config.allow_credentials,
            max_age: config.max_age_secs.map(HeaderValue::from),
        }
    }

    /// Allow any origin with the default method and header lists.
    pub fn permissive() -> Self {
        Self::new(&CorsConfig::default())
    }

    /// Value for `Access-Control-Allow-Origin`, if `origin` may see the response.
    fn allow_origin(&self, origin: Option<&str>) -> Option<HeaderValue> {
        let origin = origin?;
        if self.any_origin && !self.credentials {
            return Some(HeaderValue::from_static("*"));
        }
        if self.any_origin || self.origins.iter().any(|o| o == origin) {
            return HeaderValue::from_str(origin).ok();
        }
        None
    }

    fn apply(&self, allow: HeaderValue, response: &mut Response) {
        let echoes = allow != "*";
        response
            .headers
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow);
        if echoes {
            response
                .headers
                .append(header::VARY, HeaderValue::from_static("Origin"));
        }
        if self.credentials {
            response.headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }
}

fn join_header(values: &[String]) -> HeaderValue {
    HeaderValue::from_str(&values.join(", ")).unwrap_or_else(|_| HeaderValue::from_static("*"))
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn process_request(&self, req: &mut Request) -> Option<Response> {
        let preflight = req.method == Method::OPTIONS
            && req.headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);
        if !preflight {
            return None;
        }

        let mut response = Response::new(StatusCode::NO_CONTENT);
        if let Some(allow) = self.allow_origin(req.header(header::ORIGIN)) {
            self.apply(allow, &mut response);
            let headers = &mut response.headers;
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.methods.clone());
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.headers.clone());
            if let Some(max_age) = &self.max_age {
                headers.insert(header::ACCESS_CONTROL_MAX_AGE, max_age.clone());
            }
        } else {
            tracing::debug!(
                origin = ?req.header(header::ORIGIN),
                path = %req.path(),
                "CORS preflight from disallowed origin"
            );
        }
        Some(response)
    }

    fn process_response(&self, req: &Request, response: &mut Response) {
        if response
            .headers
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        {
            return;
        }
        if let Some(allow) = self.allow_origin(req.header(header::ORIGIN)) {
            self.apply(allow, response);
        }
    }
}
