//! Error types for the request pipeline.
//!
//! # Design
//! Each failure class stays local to the stage that produces it.
//! `ConfigError` never escapes a setter (it is logged and the store is left
//! unchanged), `AbortReason` stops a request before any network activity,
//! and `TransportError` is the only error a caller's `error` callback ever
//! sees. None of them is raised across the public API as a panic.

use thiserror::Error;

/// A configuration setter rejected its input. The store keeps its prior value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("server host is null or empty")]
    EmptyHost,

    #[error("request method is not supported: {0}")]
    UnsupportedMethod(String),

    #[error("response format is not supported: {0}")]
    UnsupportedFormat(String),

    #[error("token is null or empty")]
    EmptyToken,

    #[error("user id is null or empty")]
    EmptyUserId,

    #[error("error page is null or empty")]
    EmptyErrorPage,

    #[error("settings could not be parsed: {0}")]
    InvalidSettings(String),
}

/// Why a request was abandoned before reaching the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortReason {
    #[error("controller is missing")]
    MissingController,

    #[error("action is missing")]
    MissingAction,

    #[error("server host is not configured")]
    MissingHost,
}

/// A failure at the transport level, forwarded to the caller's `error` callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body was not valid JSON (or a malformed JSONP wrapper).
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The outgoing payload could not be encoded.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The transport could not complete the round-trip at all.
    #[error("network failure: {0}")]
    Network(String),
}

impl TransportError {
    /// jQuery-style `textStatus` for this failure.
    pub fn status_text(&self) -> &'static str {
        match self {
            TransportError::DeserializationError(_) => "parsererror",
            _ => "error",
        }
    }

    /// HTTP status carried by the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
