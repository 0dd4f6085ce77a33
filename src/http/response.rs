//! Response model.
//!
//! # Responsibilities
//! - Response envelope: status, payload, headers
//! - Conversions from handler return values (`IntoResponse`)
//! - Encoding payloads into bytes for the transport
//!
//! # Design Decisions
//! - Status defaults to 200 OK
//! - Payload is a closed set of variants; `File` is streamed from disk by
//!   the server instead of being serialized
//! - Error bodies are JSON `{"error": kind, "message": ...}` with stable kinds

use std::path::{Path, PathBuf};

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use serde::Serialize;

use crate::http::params::ParamError;

/// Response payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    Json(serde_json::Value),
    File(PathBuf),
}

/// Outgoing response. May be replaced or mutated by middleware.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: StatusCode,
    pub payload: Payload,
    pub headers: HeaderMap,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::ok().with_payload(Payload::Text(body.into()))
    }

    pub fn bytes(body: impl Into<Bytes>) -> Self {
        Self::ok().with_payload(Payload::Bytes(body.into()))
    }

    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Self::ok().with_payload(Payload::Json(v)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response payload");
                Self::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "serialization_error",
                    "Response could not be serialized",
                )
            }
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::ok().with_payload(Payload::File(path.into()))
    }

    /// Structured error body with a machine-readable kind.
    pub fn error(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self::new(status).with_payload(Payload::Json(serde_json::json!({
            "error": kind,
            "message": message.into(),
        })))
    }

    pub fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, "not_found", "No route matches the requested path")
    }

    pub fn method_not_allowed(allowed: &[Method]) -> Self {
        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let mut response = Self::error(
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "Method not allowed for this route",
        );
        if let Ok(value) = HeaderValue::from_str(&allow) {
            response.headers.insert(header::ALLOW, value);
        }
        response
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Text form of the payload, if it has one. Handy in tests and logs.
    pub fn body_text(&self) -> Option<String> {
        match &self.payload {
            Payload::Empty => Some(String::new()),
            Payload::Text(s) => Some(s.clone()),
            Payload::Json(v) => Some(v.to_string()),
            Payload::Bytes(b) => std::str::from_utf8(b).ok().map(str::to_string),
            Payload::File(_) => None,
        }
    }
}

/// Payload ready for the transport.
pub(crate) enum Encoded {
    Body(Bytes),
    File(PathBuf),
}

impl Payload {
    /// Encode into bytes, filling in `content-type` unless already set.
    pub(crate) fn encode(self, headers: &mut HeaderMap) -> Encoded {
        let (bytes, content_type) = match self {
            Payload::Empty => return Encoded::Body(Bytes::new()),
            Payload::Text(s) => (Bytes::from(s), "text/plain; charset=utf-8"),
            Payload::Bytes(b) => (b, "application/octet-stream"),
            Payload::Json(v) => (Bytes::from(v.to_string()), "application/json"),
            Payload::File(path) => return Encoded::File(path),
        };
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        Encoded::Body(bytes)
    }
}

/// Best-effort content type from a file extension.
pub(crate) fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" | "md" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Conversion of handler return values into a [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for Payload {
    fn into_response(self) -> Response {
        Response::ok().with_payload(self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for serde_json::Value {
    fn into_response(self) -> Response {
        Response::ok().with_payload(Payload::Json(self))
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::new(StatusCode::NO_CONTENT)
    }
}

impl<T: IntoResponse> IntoResponse for (StatusCode, T) {
    fn into_response(self) -> Response {
        self.1.into_response().with_status(self.0)
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

impl IntoResponse for ParamError {
    fn into_response(self) -> Response {
        Response::error(StatusCode::BAD_REQUEST, self.kind(), self.to_string())
    }
}
