//! Request model.
//!
//! # Responsibilities
//! - Hold the transport request (method, URI, headers, body)
//! - Parse the query and body parameter namespaces up front
//! - Carry the request context and typed extensions through the pipeline
//!
//! # Design Decisions
//! - Parsing happens once, before any middleware runs
//! - Body parameters come from urlencoded forms or flat JSON objects;
//!   anything else leaves the namespace empty and the raw body untouched
//! - Path parameters are filled in by the dispatcher after resolution

use axum::http::{header, request::Parts, Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use bytes::Bytes;

use crate::converters::ParamValue;
use crate::http::context::RequestContext;
use crate::http::params::ParamMap;

/// One inbound HTTP call.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Converted path captures, filled by the resolver.
    pub path_params: ParamMap,
    pub query_params: ParamMap,
    pub body_params: ParamMap,
    pub context: RequestContext,
    pub extensions: Extensions,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        let query_params = parse_query(&uri);
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            path_params: ParamMap::new(),
            query_params,
            body_params: ParamMap::new(),
            context: RequestContext::default(),
            extensions: Extensions::new(),
        }
    }

    /// Build from the transport's request head and a fully read body.
    pub fn from_parts(parts: Parts, body: Bytes, context: RequestContext) -> Self {
        let mut request = Self::new(parts.method, parts.uri);
        request.headers = parts.headers;
        request.extensions = parts.extensions;
        request.context = context;
        request.with_body(body)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the body and parse the body namespace. Set `content-type` first.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.body_params = parse_body(&self.headers, &self.body);
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn request_id(&self) -> &str {
        self.context.request_id()
    }
}

fn parse_query(uri: &Uri) -> ParamMap {
    uri.query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_body(headers: &HeaderMap, body: &Bytes) -> ParamMap {
    if body.is_empty() {
        return ParamMap::new();
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "application/x-www-form-urlencoded" => url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        "application/json" => match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(fields)) => {
                let mut params = ParamMap::new();
                for (key, value) in fields {
                    match value {
                        serde_json::Value::Array(items) => {
                            for item in items {
                                if let Some(v) = json_scalar(item) {
                                    params.insert(key.clone(), v);
                                }
                            }
                        }
                        other => {
                            if let Some(v) = json_scalar(other) {
                                params.insert(key, v);
                            }
                        }
                    }
                }
                params
            }
            Ok(_) => ParamMap::new(),
            Err(e) => {
                tracing::debug!(error = %e, "Body is not valid JSON; body params left empty");
                ParamMap::new()
            }
        },
        _ => ParamMap::new(),
    }
}

/// Scalars only; nested objects are reachable through the raw body.
fn json_scalar(value: serde_json::Value) -> Option<ParamValue> {
    match value {
        serde_json::Value::Bool(b) => Some(ParamValue::Bool(b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(ParamValue::Int)
            .or_else(|| n.as_f64().map(ParamValue::Float)),
        serde_json::Value::String(s) => Some(ParamValue::Str(s)),
        _ => None,
    }
}
