//! Request façade for a single controller/action backend.
//!
//! # Overview
//! Every call addresses `host + controller + "/" + action`. Around the
//! network round-trip the client optionally encrypts the payload and
//! decrypts the response through host-provided bridges, and diverts
//! "session invalid" responses to a host handler before they reach the
//! caller.
//!
//! # Design
//! - The network itself is injected (`Transport`); the core builds an
//!   `HttpRequest` and parses an `HttpResponse`, keeping the pipeline
//!   deterministic and testable without I/O.
//! - Configuration is an explicit `ClientConfig` owned by the `ApiClient`,
//!   not process-global state.
//! - Bridges, mask and dialog handlers are optional injected dependencies;
//!   an absent bridge means "pass the payload through".
//! - `ApiClient::send` is uniformly async. Callbacks still fire, and the
//!   returned `Dispatch` reports how the request ended.

pub mod args;
pub mod client;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod http;
pub mod session;
pub mod transport;
pub mod url;

pub use args::{ArgValue, KeyMatch, RequestArgs, RequestInput, RequestOptions};
pub use client::{ApiClient, Dispatch};
pub use config::{ClientConfig, RequestMethod, ResponseFormat, Settings};
pub use crypto::{DecryptBridge, EncryptBridge};
pub use envelope::ResponseEnvelope;
pub use error::{AbortReason, ConfigError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{Navigator, SessionBridge};
pub use transport::{Completion, Transport, TransportFailure};
