//! The network seam and the values handed to `error` / `complete` callbacks.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round-trip on behalf of the client.
///
/// Implementations return `Ok` for every response the server sent,
/// whatever its status; status interpretation happens in the core.
/// `Err` is reserved for failures where no response exists.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Details passed to the caller's `error` callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub status: Option<u16>,
    pub status_text: String,
    pub error: TransportError,
}

impl From<TransportError> for TransportFailure {
    fn from(error: TransportError) -> Self {
        Self {
            status: error.status(),
            status_text: error.status_text().to_string(),
            error,
        }
    }
}

/// Details passed to the caller's `complete` callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub status: Option<u16>,
    pub status_text: String,
}

impl Completion {
    pub fn success(status: u16) -> Self {
        Self {
            status: Some(status),
            status_text: "success".to_string(),
        }
    }
}

impl From<&TransportFailure> for Completion {
    fn from(failure: &TransportFailure) -> Self {
        Self {
            status: failure.status,
            status_text: failure.status_text.clone(),
        }
    }
}
