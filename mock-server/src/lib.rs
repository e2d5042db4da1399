use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub const OK_STATUS: &str = "000000";
pub const DUPLICATE_LOGIN_STATUS: &str = "002100";
pub const USER_INVALID_STATUS: &str = "003123";

/// One request as the server saw it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedCall {
    pub method: String,
    pub controller: String,
    pub action: String,
    pub params: Map<String, Value>,
}

pub type CallLog = Arc<RwLock<Vec<RecordedCall>>>;

type Pairs = Vec<(String, String)>;

pub fn app() -> Router {
    app_with_log(CallLog::default())
}

pub fn app_with_log(log: CallLog) -> Router {
    Router::new()
        .route("/{controller}/{action}", get(handle_get).post(handle_post))
        .with_state(log)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_log(listener: TcpListener, log: CallLog) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_log(log)).await
}

async fn handle_get(
    State(log): State<CallLog>,
    Path((controller, action)): Path<(String, String)>,
    Query(query): Query<Pairs>,
) -> Response {
    handle(log, "GET", controller, action, query).await
}

async fn handle_post(
    State(log): State<CallLog>,
    Path((controller, action)): Path<(String, String)>,
    Query(query): Query<Pairs>,
    Form(form): Form<Pairs>,
) -> Response {
    let mut pairs = query;
    pairs.extend(form);
    handle(log, "POST", controller, action, pairs).await
}

async fn handle(
    log: CallLog,
    method: &str,
    controller: String,
    action: String,
    pairs: Pairs,
) -> Response {
    let (callback, params) = split_callback(pairs);
    debug!(%method, %controller, %action, "call");
    log.write().await.push(RecordedCall {
        method: method.to_string(),
        controller: controller.clone(),
        action: action.clone(),
        params: params.clone(),
    });

    if controller == "fail" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response();
    }

    let envelope = match (controller.as_str(), action.as_str()) {
        ("session", "expired") => json!({
            "status": DUPLICATE_LOGIN_STATUS,
            "msg": "logged in elsewhere",
            "data": null
        }),
        ("session", "invalid") => json!({
            "status": USER_INVALID_STATUS,
            "msg": "user invalid"
        }),
        ("echo", "text") => json!({
            "status": OK_STATUS,
            "data": json!({"a": 1}).to_string()
        }),
        ("echo", "raw") => json!({"status": OK_STATUS, "data": "not json"}),
        _ => json!({
            "status": OK_STATUS,
            "msg": "ok",
            "data": {
                "method": method,
                "controller": controller,
                "action": action,
                "params": params
            }
        }),
    };
    respond(envelope, callback)
}

/// Pull the `jsonp` callback out and fold the rest into an object.
/// Repeated keys (`tags[]=a&tags[]=b`) collect into an array.
fn split_callback(pairs: Pairs) -> (Option<String>, Map<String, Value>) {
    let mut callback = None;
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in pairs {
        if key == "jsonp" {
            callback = Some(value);
        } else {
            grouped.entry(key).or_default().push(value);
        }
    }
    let params = grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                Value::String(values.remove(0))
            } else {
                Value::from(values)
            };
            (key, value)
        })
        .collect();
    (callback, params)
}

fn respond(envelope: Value, callback: Option<String>) -> Response {
    match callback {
        Some(callback) => (
            [(header::CONTENT_TYPE, "application/javascript")],
            format!("{callback}({envelope});"),
        )
            .into_response(),
        None => Json(envelope).into_response(),
    }
}
