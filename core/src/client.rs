//! Request dispatcher for the controller/action backend.
//!
//! # Design
//! `ApiClient` owns the configuration and every injected collaborator. One
//! call to `send` walks a fixed pipeline:
//!
//! normalize → resolve URL → encrypt → transport → intercept → decrypt → callbacks
//!
//! Stages are awaited in order, so encryption finishes before the network
//! call starts, interception runs before decryption, and a `success` or
//! `error` callback always fires before `complete`. An unresolvable URL or
//! a session fault ends the request without invoking any caller callback.
//! Nothing here panics or returns an error: the outcome is reported through
//! callbacks and through the returned `Dispatch`.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::args::{normalize, KeyMatch, RequestArgs, RequestInput};
use crate::config::{ClientConfig, ResponseFormat};
use crate::crypto::{self, DecryptBridge, EncryptBridge, GateContext};
use crate::envelope::ResponseEnvelope;
use crate::error::AbortReason;
use crate::http;
use crate::session::{Interception, LogNavigator, Navigator, SessionBridge, SessionInterceptor};
use crate::transport::{Completion, Transport, TransportFailure};
use crate::url;

/// Shown through the dialog `error` channel when a request cannot be addressed.
pub const SERVICE_NOT_FOUND: &str = "service address not found";

/// How a request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Stopped before any network activity.
    Aborted(AbortReason),
    /// The server reported an invalid session; the request was diverted.
    SessionFault { status: String },
    /// The `success` path ran with this envelope.
    Succeeded(ResponseEnvelope),
    /// The `error` path ran with this failure.
    Failed(TransportFailure),
}

pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    encrypt_bridge: Option<Arc<dyn EncryptBridge>>,
    decrypt_bridge: Option<Arc<dyn DecryptBridge>>,
    session_bridge: Option<Arc<dyn SessionBridge>>,
    navigator: Arc<dyn Navigator>,
    key_match: KeyMatch,
}

impl ApiClient {
    pub fn new(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            encrypt_bridge: None,
            decrypt_bridge: None,
            session_bridge: None,
            navigator: Arc::new(LogNavigator),
            key_match: KeyMatch::default(),
        }
    }

    pub fn with_encrypt_bridge(mut self, bridge: impl EncryptBridge + 'static) -> Self {
        self.encrypt_bridge = Some(Arc::new(bridge));
        self
    }

    pub fn with_decrypt_bridge(mut self, bridge: impl DecryptBridge + 'static) -> Self {
        self.decrypt_bridge = Some(Arc::new(bridge));
        self
    }

    /// Handler for duplicate login / invalid session responses.
    pub fn with_session_bridge(mut self, bridge: impl SessionBridge + 'static) -> Self {
        self.session_bridge = Some(Arc::new(bridge));
        self
    }

    pub fn with_navigator(mut self, navigator: impl Navigator + 'static) -> Self {
        self.navigator = Arc::new(navigator);
        self
    }

    /// How object-form argument keys are matched. Case-insensitive by default.
    pub fn with_key_match(mut self, key_match: KeyMatch) -> Self {
        self.key_match = key_match;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    /// Run one request through the pipeline.
    pub async fn send(&self, input: impl Into<RequestInput>) -> Dispatch {
        let span = info_span!("request", request_id = %Uuid::new_v4());
        self.dispatch(input.into()).instrument(span).await
    }

    async fn dispatch(&self, input: RequestInput) -> Dispatch {
        let mut args = normalize(input, self.key_match);
        let url = match url::resolve(
            self.config.host(),
            args.controller.as_deref().unwrap_or_default(),
            args.action.as_deref().unwrap_or_default(),
        ) {
            Ok(url) => url,
            Err(reason) => {
                self.config.dialog().error(SERVICE_NOT_FOUND);
                warn!(%reason, "request aborted");
                return Dispatch::Aborted(reason);
            }
        };
        debug!(%url, "resolved endpoint");

        let loading = args.loading.unwrap_or(true);
        let gate = GateContext::resolve(args.encrypt, args.token.as_deref(), &self.config);

        let payload = crypto::effective_payload(args.data.take());
        let payload = crypto::encrypt(&gate, payload, self.encrypt_bridge.as_deref()).await;
        let payload = with_token(payload, gate.token.as_deref());

        let format = self.config.response_format();
        let callback = (format == ResponseFormat::Jsonp)
            .then(|| format!("jsonp_{}", Uuid::new_v4().simple()));
        let request = match http::build_request(
            &url,
            self.config.method(),
            format,
            &payload,
            callback.as_deref(),
            args.is_async == Some(false),
        ) {
            Ok(request) => request,
            Err(error) => return fail(&mut args, TransportFailure::from(error)),
        };

        if loading {
            self.config.mask().show();
        }
        debug!(method = ?request.method, "sending");
        let received = match self.transport.execute(request).await {
            Ok(response) => http::parse_response(format, callback.as_deref(), &response)
                .map(|body| (response.status, body)),
            Err(error) => Err(error),
        };
        if loading {
            self.config.mask().hide();
        }

        let (status, body) = match received {
            Ok(received) => received,
            Err(error) => {
                warn!(%error, "transport failed");
                return fail(&mut args, TransportFailure::from(error));
            }
        };

        let interceptor = SessionInterceptor {
            bridge: self.session_bridge.as_deref(),
            navigator: self.navigator.as_ref(),
            error_page: self.config.error_page(),
        };
        let body = match interceptor.intercept(body) {
            Interception::Pass(body) => body,
            Interception::Diverted { status } => return Dispatch::SessionFault { status },
        };

        let mut envelope = ResponseEnvelope::from_value(body);
        let data = std::mem::take(&mut envelope.data);
        let data = crypto::decrypt(&gate, data, self.decrypt_bridge.as_deref()).await;
        envelope.data = parse_data(data);

        if let Some(success) = args.success.take() {
            success(&envelope);
        }
        if let Some(complete) = args.complete.take() {
            complete(&Completion::success(status));
        }
        Dispatch::Succeeded(envelope)
    }
}

/// Run the error path: `error`, then `complete`.
fn fail(args: &mut RequestArgs, failure: TransportFailure) -> Dispatch {
    if let Some(error) = args.error.take() {
        error(&failure);
    }
    if let Some(complete) = args.complete.take() {
        complete(&Completion::from(&failure));
    }
    Dispatch::Failed(failure)
}

/// Wrap a non-object payload as `{"data": payload}` and add `token` when known.
fn with_token(payload: Value, token: Option<&str>) -> Value {
    let mut map = match payload {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    if let Some(token) = token {
        map.insert("token".to_string(), Value::String(token.to_string()));
    }
    Value::Object(map)
}

/// A string that holds JSON is decoded; any other string is kept as is.
fn parse_data(data: Value) -> Value {
    match data {
        Value::String(text) => match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "response data is not JSON, keeping raw string");
                Value::String(text)
            }
        },
        other => other,
    }
}
