//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! The core describes each round-trip as plain data: it builds an
//! `HttpRequest` and parses an `HttpResponse`, while the injected
//! `Transport` performs the actual I/O. Payloads are serialized the way
//! jQuery's `$.param` does (`a[b]=1`, `list[]=x`), so a backend written for
//! browser clients sees identical parameters.
//!
//! JSONP requests are always GET; the callback name travels in the `jsonp`
//! query parameter and the `callback(...)` wrapper is stripped before the
//! body is parsed.

use serde_json::Value;

use crate::config::{RequestMethod, ResponseFormat};
use crate::error::TransportError;

/// Query parameter carrying the JSONP callback name.
pub const JSONP_PARAM: &str = "jsonp";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl From<RequestMethod> for HttpMethod {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Get => HttpMethod::Get,
            RequestMethod::Post => HttpMethod::Post,
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL, including the query string for GET requests.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// The caller asked for a blocking round-trip (`async: false`).
    pub synchronous: bool,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Flatten an object payload into `$.param`-style key/value pairs.
pub fn form_pairs(payload: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Value::Object(map) = payload {
        for (key, value) in map {
            push_pairs(&mut pairs, key.clone(), value);
        }
    }
    pairs
}

fn push_pairs(pairs: &mut Vec<(String, String)>, prefix: String, value: &Value) {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if prefix.ends_with("[]") {
                    pairs.push((prefix.clone(), scalar_text(item)));
                } else if item.is_object() || item.is_array() {
                    push_pairs(pairs, format!("{prefix}[{i}]"), item);
                } else {
                    push_pairs(pairs, format!("{prefix}[]"), item);
                }
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                push_pairs(pairs, format!("{prefix}[{key}]"), item);
            }
        }
        scalar => pairs.push((prefix, scalar_text(scalar))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn encode_form(payload: &Value) -> Result<String, TransportError> {
    serde_urlencoded::to_string(form_pairs(payload))
        .map_err(|e| TransportError::SerializationError(e.to_string()))
}

/// Build the request for `url` carrying `payload`.
///
/// `callback` must be set for JSONP; it forces GET.
pub fn build_request(
    url: &str,
    method: RequestMethod,
    format: ResponseFormat,
    payload: &Value,
    callback: Option<&str>,
    synchronous: bool,
) -> Result<HttpRequest, TransportError> {
    let mut query = encode_form(payload)?;
    let method = match (format, callback) {
        (ResponseFormat::Jsonp, Some(callback)) => {
            let param = serde_urlencoded::to_string(vec![(JSONP_PARAM, callback)])
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&param);
            HttpMethod::Get
        }
        _ => HttpMethod::from(method),
    };

    let request = match method {
        HttpMethod::Get => HttpRequest {
            method,
            url: append_query(url, &query),
            headers: Vec::new(),
            body: None,
            synchronous,
        },
        HttpMethod::Post => HttpRequest {
            method,
            url: url.to_string(),
            headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
            body: Some(query),
            synchronous,
        },
    };
    Ok(request)
}

fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{query}")
}

/// Check the status and decode the body according to `format`.
pub fn parse_response(
    format: ResponseFormat,
    callback: Option<&str>,
    response: &HttpResponse,
) -> Result<Value, TransportError> {
    check_status(response)?;
    let json = match (format, callback) {
        (ResponseFormat::Jsonp, Some(callback)) => unwrap_jsonp(&response.body, callback)?,
        _ => response.body.as_str(),
    };
    serde_json::from_str(json).map_err(|e| TransportError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to `TransportError::HttpError`.
fn check_status(response: &HttpResponse) -> Result<(), TransportError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    Err(TransportError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Strip `callback(` ... `)` (optionally followed by `;`).
fn unwrap_jsonp<'a>(body: &'a str, callback: &str) -> Result<&'a str, TransportError> {
    body.trim()
        .strip_prefix(callback)
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('('))
        .map(|rest| rest.trim_end().trim_end_matches(';').trim_end())
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| TransportError::DeserializationError(format!("{callback} was not called")))
}
