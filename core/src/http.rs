//! HTTP transport types and the JSON request/response contract.
//!
//! # Design
//! Requests and responses are plain data. `build_request` produces an
//! `HttpRequest` with the JSON content type and optional bearer token, and
//! `parse_json` classifies an `HttpResponse` into a parsed body or an
//! `ApiError`. Neither touches the network; a `Transport` executes the
//! round-trip in between. The token is always passed in by value, this module
//! never reads a session store.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;

/// Fields tried, in order, for a human-readable error message.
const MESSAGE_FIELDS: [&str; 3] = ["message", "detail", "error"];

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Build a JSON request for `url`.
///
/// `body` is only accepted for POST and PATCH. The `authorization` header is
/// added only when `token` is present and non-empty.
pub fn build_request<B>(
    method: HttpMethod,
    url: &str,
    body: Option<&B>,
    token: Option<&str>,
) -> Result<HttpRequest, ApiError>
where
    B: Serialize + ?Sized,
{
    if url.trim().is_empty() {
        return Err(ApiError::InvalidArgument("request url must not be empty".to_string()));
    }
    if method == HttpMethod::Get && body.is_some() {
        return Err(ApiError::InvalidArgument("GET requests cannot carry a body".to_string()));
    }

    let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        headers.push(("authorization".to_string(), format!("Bearer {token}")));
    }

    let body = body
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| ApiError::Serialization(e.to_string()))?;

    Ok(HttpRequest {
        method,
        url: url.to_string(),
        headers,
        body,
    })
}

/// Classify `response` and parse its JSON body.
///
/// Returns `Ok(None)` for a `204` answer to a GET and for any 2xx body on
/// PATCH that does not parse as `T` (empty, plain text). Every other 2xx
/// body must be valid JSON for `T`.
pub fn parse_json<T: DeserializeOwned>(
    method: HttpMethod,
    url: &str,
    response: &HttpResponse,
) -> Result<Option<T>, ApiError> {
    if !response.is_success() {
        return Err(ApiError::Api {
            message: extract_error_message(&response.body, response.status),
            status: response.status,
        });
    }
    if method == HttpMethod::Get && response.status == 204 {
        return Ok(None);
    }
    if method == HttpMethod::Patch && response.body.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(&response.body) {
        Ok(value) => Ok(Some(value)),
        Err(e) if method == HttpMethod::Patch => {
            debug!(%url, status = response.status, error = %e, "PATCH response body is not JSON, treating as empty");
            Ok(None)
        }
        Err(e) => {
            debug!(%url, status = response.status, error = %e, "response body is not valid JSON");
            Err(ApiError::Parse {
                url: url.to_string(),
                status: response.status,
            })
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Probes `message`, `detail` and `error` in that order. A validation-style
/// `detail` array yields its first `msg`. Falls back to the status reason
/// phrase.
pub fn extract_error_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for field in MESSAGE_FIELDS {
            match value.get(field) {
                Some(Value::String(message)) if !message.trim().is_empty() => {
                    return message.clone();
                }
                Some(Value::Array(items)) => {
                    if let Some(message) = items
                        .iter()
                        .find_map(|item| item.get("msg").and_then(Value::as_str))
                    {
                        return message.to_string();
                    }
                }
                _ => {}
            }
        }
    }

    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
