//! Encryption and decryption gates.
//!
//! # Design
//! The core never encrypts anything itself. It decides *whether* the
//! host-provided bridges run, and hands them `(token, user_id, payload)`.
//! Both gates read the same `GateContext`, resolved once per request, so a
//! response is only decrypted when its request was encrypted.
//!
//! A gate is a pass-through unless all three hold: a token is available,
//! the request asked for encryption, and the matching bridge is registered.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ClientConfig;

/// Field of the default payload sent when a request carries no data.
pub const TIMESTAMP_FIELD: &str = "__timestamp__";

/// Host-application request encryption.
#[async_trait]
pub trait EncryptBridge: Send + Sync {
    async fn encrypt_request(&self, token: &str, user_id: Option<&str>, payload: Value) -> Value;
}

/// Host-application response decryption.
#[async_trait]
pub trait DecryptBridge: Send + Sync {
    async fn decrypt_response(&self, token: &str, user_id: Option<&str>, payload: Value) -> Value;
}

/// Per-request inputs shared by both gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateContext {
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub encrypt: bool,
}

impl GateContext {
    /// `encrypt` is true only for an explicit `true`. The request's own
    /// token wins over the configured one.
    pub fn resolve(encrypt: Option<bool>, token: Option<&str>, config: &ClientConfig) -> Self {
        Self {
            token: token.or(config.token()).map(str::to_string),
            user_id: config.user_id().map(str::to_string),
            encrypt: encrypt == Some(true),
        }
    }

    /// The token to hand a bridge, when the gates are active.
    fn active_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|_| self.encrypt)
    }
}

/// `{"__timestamp__": <unix millis>}`, so every request carries a changing value.
pub fn default_payload() -> Value {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    json!({ TIMESTAMP_FIELD: millis })
}

/// The caller's data, or the default payload when it is absent or falsy
/// (`null`, `false`, `0`, `""`).
pub fn effective_payload(data: Option<Value>) -> Value {
    match data {
        Some(v) if !is_falsy(&v) => v,
        _ => default_payload(),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

pub async fn encrypt(ctx: &GateContext, payload: Value, bridge: Option<&dyn EncryptBridge>) -> Value {
    match (ctx.active_token(), bridge) {
        (Some(token), Some(bridge)) => {
            debug!("encrypting request payload");
            bridge
                .encrypt_request(token, ctx.user_id.as_deref(), payload)
                .await
        }
        _ => payload,
    }
}

pub async fn decrypt(ctx: &GateContext, data: Value, bridge: Option<&dyn DecryptBridge>) -> Value {
    match (ctx.active_token(), bridge) {
        (Some(token), Some(bridge)) => {
            debug!("decrypting response data");
            bridge
                .decrypt_response(token, ctx.user_id.as_deref(), data)
                .await
        }
        _ => data,
    }
}
