//! Request argument normalization.
//!
//! # Design
//! Callers reach `ApiClient::send` through one of three shapes, modelled as
//! the `RequestInput` tagged union:
//! - `Options`: the typed builder (`RequestOptions`), the preferred entry.
//! - `Object`: loosely keyed pairs whose keys are matched against the nine
//!   argument names, case-insensitively unless `KeyMatch::CaseSensitive`.
//! - `Positional`: the nine values in fixed order, kept as a compat shim.
//!
//! All three collapse into a fresh `RequestArgs` per call. A value with the
//! wrong shape for its slot (a JSON value where a callback belongs, a
//! string where a boolean belongs) counts as not supplied.

use std::fmt;

use serde_json::{Map, Value};

use crate::envelope::ResponseEnvelope;
use crate::transport::{Completion, TransportFailure};

/// Argument names in positional order.
pub const ARG_NAMES: [&str; 9] = [
    "controller",
    "action",
    "data",
    "success",
    "error",
    "complete",
    "async",
    "encrypt",
    "loading",
];

pub type SuccessFn = Box<dyn FnOnce(&ResponseEnvelope) + Send>;
pub type ErrorFn = Box<dyn FnOnce(&TransportFailure) + Send>;
pub type CompleteFn = Box<dyn FnOnce(&Completion) + Send>;

/// One loosely typed argument value.
pub enum ArgValue {
    Json(Value),
    Success(SuccessFn),
    Error(ErrorFn),
    Complete(CompleteFn),
}

impl ArgValue {
    pub fn success(f: impl FnOnce(&ResponseEnvelope) + Send + 'static) -> Self {
        ArgValue::Success(Box::new(f))
    }

    pub fn error(f: impl FnOnce(&TransportFailure) + Send + 'static) -> Self {
        ArgValue::Error(Box::new(f))
    }

    pub fn complete(f: impl FnOnce(&Completion) + Send + 'static) -> Self {
        ArgValue::Complete(Box::new(f))
    }
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        ArgValue::Json(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Json(Value::String(value.to_string()))
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Json(Value::Bool(value))
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Json(v) => f.debug_tuple("Json").field(v).finish(),
            ArgValue::Success(_) => f.write_str("Success(..)"),
            ArgValue::Error(_) => f.write_str("Error(..)"),
            ArgValue::Complete(_) => f.write_str("Complete(..)"),
        }
    }
}

/// How object keys are compared with argument names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMatch {
    #[default]
    CaseInsensitive,
    CaseSensitive,
}

impl KeyMatch {
    fn matches(self, key: &str, name: &str) -> bool {
        match self {
            KeyMatch::CaseInsensitive => key.to_lowercase() == name.to_lowercase(),
            KeyMatch::CaseSensitive => key == name,
        }
    }
}

/// Canonical per-call request record. Only supplied slots are `Some`.
#[derive(Default)]
pub struct RequestArgs {
    pub controller: Option<String>,
    pub action: Option<String>,
    pub data: Option<Value>,
    pub success: Option<SuccessFn>,
    pub error: Option<ErrorFn>,
    pub complete: Option<CompleteFn>,
    pub is_async: Option<bool>,
    pub encrypt: Option<bool>,
    pub loading: Option<bool>,
    /// Per-request token override; only reachable through `RequestOptions`.
    pub token: Option<String>,
}

impl RequestArgs {
    pub fn is_empty(&self) -> bool {
        self.controller.is_none()
            && self.action.is_none()
            && self.data.is_none()
            && self.success.is_none()
            && self.error.is_none()
            && self.complete.is_none()
            && self.is_async.is_none()
            && self.encrypt.is_none()
            && self.loading.is_none()
            && self.token.is_none()
    }

    /// Store `value` in the slot called `name`, if its shape fits.
    fn assign(&mut self, name: &str, value: ArgValue) {
        match (name, value) {
            ("controller", ArgValue::Json(v)) => self.controller = non_empty_string(v),
            ("action", ArgValue::Json(v)) => self.action = non_empty_string(v),
            ("data", ArgValue::Json(v)) => self.data = Some(v),
            ("success", ArgValue::Success(f)) => self.success = Some(f),
            ("error", ArgValue::Error(f)) => self.error = Some(f),
            ("complete", ArgValue::Complete(f)) => self.complete = Some(f),
            ("async", ArgValue::Json(v)) => self.is_async = v.as_bool(),
            ("encrypt", ArgValue::Json(v)) => self.encrypt = v.as_bool(),
            ("loading", ArgValue::Json(v)) => self.loading = v.as_bool(),
            _ => {}
        }
    }
}

impl fmt::Debug for RequestArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestArgs")
            .field("controller", &self.controller)
            .field("action", &self.action)
            .field("data", &self.data)
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .field("complete", &self.complete.is_some())
            .field("is_async", &self.is_async)
            .field("encrypt", &self.encrypt)
            .field("loading", &self.loading)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Typed builder for a single request.
#[derive(Debug)]
pub struct RequestOptions {
    args: RequestArgs,
}

impl RequestOptions {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        let args = RequestArgs {
            controller: Some(controller.into()).filter(|c| !c.is_empty()),
            action: Some(action.into()).filter(|a| !a.is_empty()),
            ..RequestArgs::default()
        };
        Self { args }
    }

    pub fn data(mut self, data: Value) -> Self {
        self.args.data = Some(data);
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(&ResponseEnvelope) + Send + 'static) -> Self {
        self.args.success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&TransportFailure) + Send + 'static) -> Self {
        self.args.error = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(&Completion) + Send + 'static) -> Self {
        self.args.complete = Some(Box::new(f));
        self
    }

    /// Hint for the transport; `false` asks for a blocking round-trip.
    pub fn is_async(mut self, is_async: bool) -> Self {
        self.args.is_async = Some(is_async);
        self
    }

    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.args.encrypt = Some(encrypt);
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.args.loading = Some(loading);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.args.token = Some(token.into()).filter(|t| !t.is_empty());
        self
    }
}

/// Every accepted calling convention.
#[derive(Debug)]
pub enum RequestInput {
    Options(RequestOptions),
    Object(Vec<(String, ArgValue)>),
    Positional(Vec<ArgValue>),
}

impl RequestInput {
    /// Object form only when the first value is a JSON object; positional
    /// otherwise. Values after a leading object are ignored.
    pub fn from_values(mut values: Vec<ArgValue>) -> Self {
        if matches!(values.first(), Some(ArgValue::Json(Value::Object(_)))) {
            if let ArgValue::Json(Value::Object(map)) = values.swap_remove(0) {
                return RequestInput::from(map);
            }
        }
        RequestInput::Positional(values)
    }
}

impl From<RequestOptions> for RequestInput {
    fn from(options: RequestOptions) -> Self {
        RequestInput::Options(options)
    }
}

impl From<Map<String, Value>> for RequestInput {
    fn from(map: Map<String, Value>) -> Self {
        RequestInput::Object(map.into_iter().map(|(k, v)| (k, ArgValue::Json(v))).collect())
    }
}

impl From<Vec<ArgValue>> for RequestInput {
    fn from(values: Vec<ArgValue>) -> Self {
        RequestInput::from_values(values)
    }
}

/// Collapse `input` into a `RequestArgs`.
///
/// Returns an empty record when no controller was supplied; the caller must
/// abort before any side effect.
pub fn normalize(input: RequestInput, keys: KeyMatch) -> RequestArgs {
    let args = match input {
        RequestInput::Options(options) => options.args,
        RequestInput::Positional(values) => {
            let mut args = RequestArgs::default();
            for (name, value) in ARG_NAMES.iter().zip(values) {
                args.assign(name, value);
            }
            args
        }
        RequestInput::Object(pairs) => {
            let mut args = RequestArgs::default();
            for (key, value) in pairs {
                if let Some(name) = ARG_NAMES.iter().find(|name| keys.matches(&key, name.trim())) {
                    args.assign(name, value);
                }
            }
            args
        }
    };

    if args.controller.is_none() {
        return RequestArgs::default();
    }
    args
}
