//! Server response envelope.
//!
//! The backend answers every controller/action call with
//! `{status, msg?, data}`. `status` is a six-character code; unknown
//! top-level fields are preserved in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decoded server response handed to the caller's `success` callback.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseEnvelope {
    /// Split a raw response value into envelope fields.
    ///
    /// A non-object body has no status; the whole value becomes `data`.
    /// Numeric status codes are kept as their decimal text.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self {
                data: value,
                ..Self::default()
            };
        };

        let status = match map.remove("status") {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let msg = match map.remove("msg") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        let data = map.remove("data").unwrap_or(Value::Null);

        Self {
            status,
            msg,
            data,
            extra: map,
        }
    }
}
