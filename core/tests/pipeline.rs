//! End-to-end pipeline tests against an in-memory transport.
//!
//! # Design
//! `FakeTransport` answers from a closure and records every request it
//! receives. Mask, dialog, navigator and callbacks all append to one shared
//! event log, so tests can assert both *what* happened and in which order.

use std::sync::{Arc, Mutex};

use apiclient_core::{
    AbortReason, ApiClient, ArgValue, ClientConfig, DecryptBridge, Dispatch, EncryptBridge,
    HttpMethod, HttpRequest, HttpResponse, RequestInput, RequestOptions, Transport, TransportError,
};
use async_trait::async_trait;
use serde_json::{json, Value};

type Events = Arc<Mutex<Vec<String>>>;
type Reply = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

struct FakeTransport {
    sent: Arc<Mutex<Vec<HttpRequest>>>,
    events: Events,
    reply: Reply,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.events.lock().unwrap().push("transport".to_string());
        let reply = (self.reply)(&request);
        self.sent.lock().unwrap().push(request);
        reply
    }
}

struct Harness {
    client: ApiClient,
    sent: Arc<Mutex<Vec<HttpRequest>>>,
    events: Events,
}

impl Harness {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

fn harness(
    reply: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
) -> Harness {
    let events: Events = Arc::default();
    let sent = Arc::default();

    let mut config = ClientConfig::new();
    let (show, hide, dialog) = (Arc::clone(&events), Arc::clone(&events), Arc::clone(&events));
    config
        .set_host("http://api.test")
        .set_request_mode("get", "json")
        .set_mask(
            move || show.lock().unwrap().push("mask:show".to_string()),
            move || hide.lock().unwrap().push("mask:hide".to_string()),
        )
        .set_dialog(
            move |msg: &str| dialog.lock().unwrap().push(format!("dialog:{msg}")),
            None,
            None,
        );

    let transport = FakeTransport {
        sent: Arc::clone(&sent),
        events: Arc::clone(&events),
        reply: Box::new(reply),
    };
    let nav = Arc::clone(&events);
    let client = ApiClient::new(config, transport)
        .with_navigator(move |location: &str| nav.lock().unwrap().push(format!("navigate:{location}")));

    Harness { client, sent, events }
}

fn ok(body: Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status: 200,
        headers: Vec::new(),
        body: body.to_string(),
    })
}

/// Decode the parameters carried by a GET query string.
fn query_params(request: &HttpRequest) -> Vec<(String, String)> {
    let query = request.url.split_once('?').map(|(_, q)| q).unwrap_or_default();
    serde_urlencoded::from_str(query).unwrap()
}

/// Options whose callbacks log into the harness event stream.
fn tracked(h: &Harness, controller: &str, action: &str) -> RequestOptions {
    let (s, e, c) = (Arc::clone(&h.events), Arc::clone(&h.events), Arc::clone(&h.events));
    RequestOptions::new(controller, action)
        .on_success(move |env| s.lock().unwrap().push(format!("success:{}", env.data)))
        .on_error(move |f| e.lock().unwrap().push(format!("error:{}", f.status_text)))
        .on_complete(move |done| c.lock().unwrap().push(format!("complete:{}", done.status_text)))
}

// ---------------------------------------------------------------------------
// Success path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_runs_mask_success_then_complete() {
    let h = harness(|_| ok(json!({"status": "000000", "data": {"n": 1}})));

    let outcome = h.client.send(tracked(&h, "values", "get")).await;

    assert!(matches!(outcome, Dispatch::Succeeded(ref env) if env.data == json!({"n": 1})));
    assert_eq!(
        h.events(),
        vec![
            "mask:show",
            "transport",
            "mask:hide",
            "success:{\"n\":1}",
            "complete:success",
        ]
    );
    assert_eq!(h.sent()[0].url.split('?').next(), Some("http://api.test/values/get"));
}

#[tokio::test]
async fn string_data_holding_json_is_decoded() {
    let h = harness(|_| ok(json!({"status": "000000", "data": "{\"a\":1}"})));
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);

    h.client
        .send(RequestOptions::new("echo", "text").on_success(move |env| {
            *sink.lock().unwrap() = Some(env.data.clone());
        }))
        .await;

    assert_eq!(*seen.lock().unwrap(), Some(json!({"a": 1})));
}

#[tokio::test]
async fn string_data_that_is_not_json_is_kept() {
    let h = harness(|_| ok(json!({"status": "000000", "data": "not json"})));

    let outcome = h.client.send(RequestOptions::new("echo", "raw")).await;

    match outcome {
        Dispatch::Succeeded(env) => assert_eq!(env.data, json!("not json")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn loading_false_skips_mask() {
    let h = harness(|_| ok(json!({"status": "000000", "data": null})));

    h.client.send(RequestOptions::new("values", "get").loading(false)).await;

    assert_eq!(h.events(), vec!["transport"]);
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plain_payload_gains_only_token() {
    let h = harness(|_| ok(json!({"status": "000000"})));
    let mut client = h.client;
    client.config_mut().set_credentials("tok", "u1");

    client
        .send(RequestOptions::new("values", "get").data(json!({"userId": "10086"})))
        .await;

    let sent = h.sent.lock().unwrap().clone();
    assert_eq!(
        query_params(&sent[0]),
        vec![
            ("token".to_string(), "tok".to_string()),
            ("userId".to_string(), "10086".to_string()),
        ]
    );
}

#[tokio::test]
async fn missing_data_sends_timestamp() {
    let h = harness(|_| ok(json!({"status": "000000"})));

    h.client.send(RequestOptions::new("values", "get")).await;

    let params = query_params(&h.sent()[0]);
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].0, "__timestamp__");
    assert!(params[0].1.parse::<u64>().unwrap() > 0);
}

#[tokio::test]
async fn post_sends_form_body() {
    let h = harness(|_| ok(json!({"status": "000000"})));
    let mut client = h.client;
    client.config_mut().set_request_mode("post", "json");

    client
        .send(RequestOptions::new("user", "login").data(json!({"name": "n"})).is_async(false))
        .await;

    let sent = h.sent.lock().unwrap().clone();
    assert_eq!(sent[0].method, HttpMethod::Post);
    assert_eq!(sent[0].url, "http://api.test/user/login");
    assert_eq!(sent[0].body.as_deref(), Some("name=n"));
    assert!(sent[0].synchronous);
}

// ---------------------------------------------------------------------------
// Encryption bridges
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Bridge {
    calls: Arc<Mutex<Vec<(String, String, Option<String>, Value)>>>,
}

#[async_trait]
impl EncryptBridge for Bridge {
    async fn encrypt_request(&self, token: &str, user_id: Option<&str>, payload: Value) -> Value {
        self.calls.lock().unwrap().push((
            "encrypt".to_string(),
            token.to_string(),
            user_id.map(str::to_string),
            payload.clone(),
        ));
        Value::String(format!("sealed:{payload}"))
    }
}

#[async_trait]
impl DecryptBridge for Bridge {
    async fn decrypt_response(&self, token: &str, user_id: Option<&str>, payload: Value) -> Value {
        self.calls.lock().unwrap().push((
            "decrypt".to_string(),
            token.to_string(),
            user_id.map(str::to_string),
            payload,
        ));
        Value::String("{\"plain\":true}".to_string())
    }
}

#[tokio::test]
async fn encrypted_request_runs_both_bridges() {
    let bridge = Bridge::default();
    let h = harness(|_| ok(json!({"status": "000000", "data": "CIPHERTEXT"})));
    let mut client = h
        .client
        .with_encrypt_bridge(bridge.clone())
        .with_decrypt_bridge(bridge.clone());
    client.config_mut().set_credentials("tok", "u1");

    let outcome = client
        .send(RequestOptions::new("secure", "get").data(json!({"a": 1})).encrypt(true))
        .await;

    let sent = h.sent.lock().unwrap().clone();
    assert_eq!(
        query_params(&sent[0]),
        vec![
            ("data".to_string(), "sealed:{\"a\":1}".to_string()),
            ("token".to_string(), "tok".to_string()),
        ]
    );
    let calls = bridge.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            ("encrypt".to_string(), "tok".to_string(), Some("u1".to_string()), json!({"a": 1})),
            ("decrypt".to_string(), "tok".to_string(), Some("u1".to_string()), json!("CIPHERTEXT")),
        ]
    );
    assert!(matches!(outcome, Dispatch::Succeeded(env) if env.data == json!({"plain": true})));
}

#[tokio::test]
async fn bridges_are_skipped_without_token() {
    let bridge = Bridge::default();
    let h = harness(|_| ok(json!({"status": "000000", "data": "x"})));
    let client = h
        .client
        .with_encrypt_bridge(bridge.clone())
        .with_decrypt_bridge(bridge.clone());

    client
        .send(RequestOptions::new("secure", "get").data(json!({"a": 1})).encrypt(true))
        .await;

    assert!(bridge.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn per_request_token_overrides_configured_one() {
    let bridge = Bridge::default();
    let h = harness(|_| ok(json!({"status": "000000"})));
    let mut client = h.client.with_encrypt_bridge(bridge.clone());
    client.config_mut().set_credentials("tok", "u1");

    client
        .send(
            RequestOptions::new("secure", "get")
                .data(json!({"a": 1}))
                .encrypt(true)
                .token("other"),
        )
        .await;

    assert_eq!(bridge.calls.lock().unwrap()[0].1, "other");
}

// ---------------------------------------------------------------------------
// Session faults
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_login_navigates_and_skips_callbacks() {
    let h = harness(|_| ok(json!({"status": "002100", "msg": "m"})));

    let outcome = h.client.send(tracked(&h, "values", "get")).await;

    assert_eq!(outcome, Dispatch::SessionFault { status: "002100".to_string() });
    assert_eq!(
        h.events(),
        vec![
            "mask:show",
            "transport",
            "mask:hide",
            "navigate:error.html?status=002100&msg=m",
        ]
    );
}

#[tokio::test]
async fn session_bridge_replaces_navigation() {
    let h = harness(|_| ok(json!({"status": "003123", "msg": "user invalid"})));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let client = h
        .client
        .with_session_bridge(move |msg: &str| sink.lock().unwrap().push(msg.to_string()));

    let outcome = client.send(RequestOptions::new("values", "get").loading(false)).await;

    assert_eq!(outcome, Dispatch::SessionFault { status: "003123".to_string() });
    assert_eq!(*seen.lock().unwrap(), vec!["user invalid"]);
    assert_eq!(*h.events.lock().unwrap(), vec!["transport"]);
}

#[tokio::test]
async fn other_status_families_are_not_intercepted() {
    let h = harness(|_| ok(json!({"status": "004123", "data": 1})));

    let outcome = h.client.send(tracked(&h, "values", "get")).await;

    assert!(matches!(outcome, Dispatch::Succeeded(_)));
    assert!(h.events().contains(&"success:1".to_string()));
}

#[tokio::test]
async fn session_fault_skips_decryption() {
    let bridge = Bridge::default();
    let h = harness(|_| ok(json!({"status": "002100", "msg": "m", "data": "CIPHER"})));
    let mut client = h.client.with_decrypt_bridge(bridge.clone());
    client.config_mut().set_credentials("tok", "u1");

    client.send(RequestOptions::new("values", "get").encrypt(true)).await;

    assert!(bridge.calls.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Transport failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn http_error_runs_error_then_complete() {
    let h = harness(|_| {
        Ok(HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: "internal error".to_string(),
        })
    });

    let outcome = h.client.send(tracked(&h, "values", "get")).await;

    match outcome {
        Dispatch::Failed(failure) => {
            assert_eq!(failure.status, Some(500));
            assert_eq!(failure.status_text, "error");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        h.events(),
        vec!["mask:show", "transport", "mask:hide", "error:error", "complete:error"]
    );
}

#[tokio::test]
async fn network_failure_reaches_error_callback() {
    let h = harness(|_| Err(TransportError::Network("connection refused".to_string())));
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);

    h.client
        .send(RequestOptions::new("values", "get").on_error(move |f| {
            *sink.lock().unwrap() = Some(f.error.clone());
        }))
        .await;

    assert_eq!(
        *seen.lock().unwrap(),
        Some(TransportError::Network("connection refused".to_string()))
    );
}

#[tokio::test]
async fn malformed_body_is_parsererror() {
    let h = harness(|_| {
        Ok(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: "<html>".to_string(),
        })
    });

    let outcome = h.client.send(tracked(&h, "values", "get")).await;

    assert!(matches!(outcome, Dispatch::Failed(ref f) if f.status_text == "parsererror"));
    assert!(h.events().ends_with(&["error:parsererror".to_string(), "complete:parsererror".to_string()]));
}

// ---------------------------------------------------------------------------
// Aborts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_controller_aborts_without_network_or_callbacks() {
    let h = harness(|_| ok(json!({"status": "000000"})));
    let (s, c) = (Arc::clone(&h.events), Arc::clone(&h.events));
    let input = RequestInput::from_values(vec![
        ArgValue::Json(Value::Null),
        "get".into(),
        Value::Null.into(),
        ArgValue::success(move |_| s.lock().unwrap().push("success".to_string())),
        ArgValue::error(|_| {}),
        ArgValue::complete(move |_| c.lock().unwrap().push("complete".to_string())),
    ]);

    let outcome = h.client.send(input).await;

    assert_eq!(outcome, Dispatch::Aborted(AbortReason::MissingController));
    assert!(h.sent().is_empty());
    assert_eq!(h.events(), vec!["dialog:service address not found"]);
}

#[tokio::test]
async fn missing_host_aborts() {
    let h = harness(|_| ok(json!({"status": "000000"})));
    let mut client = h.client;
    *client.config_mut() = ClientConfig::new();

    let outcome = client.send(RequestOptions::new("values", "get")).await;

    assert_eq!(outcome, Dispatch::Aborted(AbortReason::MissingHost));
    assert!(h.sent.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Calling conventions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn positional_arguments_dispatch() {
    let h = harness(|_| ok(json!({"status": "000000", "data": "ok"})));
    let s = Arc::clone(&h.events);

    h.client
        .send(vec![
            "values".into(),
            "get".into(),
            json!({"k": "v"}).into(),
            ArgValue::success(move |env| s.lock().unwrap().push(format!("success:{}", env.data))),
            ArgValue::error(|_| {}),
            ArgValue::complete(|_| {}),
            true.into(),
            false.into(),
            false.into(),
        ])
        .await;

    assert_eq!(h.events(), vec!["transport", "success:\"ok\""]);
    assert_eq!(query_params(&h.sent()[0]), vec![("k".to_string(), "v".to_string())]);
}

#[tokio::test]
async fn object_arguments_match_keys_case_insensitively() {
    let h = harness(|_| ok(json!({"status": "000000"})));

    let map = json!({"CONTROLLER": "values", "Action": "get", "Loading": false, "extra": 1})
        .as_object()
        .cloned()
        .unwrap();
    let outcome = h.client.send(map).await;

    assert!(matches!(outcome, Dispatch::Succeeded(_)));
    assert_eq!(h.events(), vec!["transport"]);
}

#[tokio::test]
async fn jsonp_round_trip_uses_generated_callback() {
    let h = harness(|req| {
        let callback = query_params(req)
            .into_iter()
            .find(|(k, _)| k == "jsonp")
            .map(|(_, v)| v)
            .unwrap();
        Ok(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: format!("{callback}({});", json!({"status": "000000", "data": [1, 2]})),
        })
    });
    let mut client = h.client;
    client.config_mut().set_request_mode("post", "jsonp");

    let outcome = client.send(RequestOptions::new("values", "list").loading(false)).await;

    assert!(matches!(outcome, Dispatch::Succeeded(env) if env.data == json!([1, 2])));
    assert_eq!(h.sent.lock().unwrap()[0].method, HttpMethod::Get);
}
