//! Session fault interception.
//!
//! A response whose status is the duplicate-login sentinel, or any
//! six-character code starting with the user-invalid prefix, means the
//! caller's session must be re-established. Such responses never reach
//! decryption or the caller's callbacks: they are diverted to the
//! registered `SessionBridge`, or failing that to a hard navigation to the
//! error page.

use serde_json::Value;
use tracing::{info, warn};

/// Status sent when the account has logged in elsewhere.
pub const DUPLICATE_LOGIN_STATUS: &str = "002100";

/// Prefix of the "user invalid" status family.
pub const USER_INVALID_PREFIX: &str = "003";

/// Length of every status code.
pub const STATUS_CODE_LEN: usize = 6;

pub fn is_session_fault(status: &str) -> bool {
    status == DUPLICATE_LOGIN_STATUS
        || (status.chars().count() == STATUS_CODE_LEN && status.starts_with(USER_INVALID_PREFIX))
}

/// Host-application handler for duplicate login / invalid session.
pub trait SessionBridge: Send + Sync {
    fn on_duplicate_login(&self, msg: &str);
}

impl<F> SessionBridge for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_duplicate_login(&self, msg: &str) {
        self(msg)
    }
}

/// Performs the hard redirect used when no `SessionBridge` is registered.
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, location: &str) {
        self(location)
    }
}

/// Default navigator for hosts without a page to redirect: logs the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, location: &str) {
        warn!(%location, "session fault redirect");
    }
}

/// `<page>?status=<status>&msg=<msg>` with both values URI-component encoded.
pub fn error_page_location(page: &str, status: &str, msg: &str) -> String {
    format!(
        "{page}?status={}&msg={}",
        urlencoding::encode(status),
        urlencoding::encode(msg)
    )
}

/// What the interceptor decided for one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Interception {
    /// Not a session fault; continue with decryption.
    Pass(Value),
    /// Session fault handled; the request stops here.
    Diverted { status: String },
}

pub struct SessionInterceptor<'a> {
    pub bridge: Option<&'a dyn SessionBridge>,
    pub navigator: &'a dyn Navigator,
    pub error_page: &'a str,
}

impl SessionInterceptor<'_> {
    pub fn intercept(&self, response: Value) -> Interception {
        let status = match response.get("status") {
            Some(Value::String(s)) if is_session_fault(s) => s.clone(),
            _ => return Interception::Pass(response),
        };
        let msg = response.get("msg").and_then(Value::as_str).unwrap_or_default();

        info!(%status, "session fault");
        match self.bridge {
            Some(bridge) => bridge.on_duplicate_login(msg),
            None => self
                .navigator
                .navigate(&error_page_location(self.error_page, &status, msg)),
        }
        Interception::Diverted { status }
    }
}
