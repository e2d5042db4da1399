//! Client configuration store.
//!
//! # Design
//! `ClientConfig` is an explicit value owned by the `ApiClient`, not a
//! process global. Setters never fail loudly: invalid input is logged with
//! `tracing::warn!` and the prior value is retained, so a chain of setters
//! always runs to the end. The validating half of each setter is public as
//! a `try_*` method for callers (and tests) that want the rejection reason.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ConfigError;

/// Page the client navigates to when a session fault has no handler.
pub const DEFAULT_ERROR_PAGE: &str = "error.html";

/// HTTP method used for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
}

impl FromStr for RequestMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(RequestMethod::Get),
            "post" => Ok(RequestMethod::Post),
            other => Err(ConfigError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMethod::Get => write!(f, "get"),
            RequestMethod::Post => write!(f, "post"),
        }
    }
}

/// Response format the server is expected to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    Json,
    #[default]
    Jsonp,
}

impl FromStr for ResponseFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ResponseFormat::Json),
            "jsonp" => Ok(ResponseFormat::Jsonp),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFormat::Json => write!(f, "json"),
            ResponseFormat::Jsonp => write!(f, "jsonp"),
        }
    }
}

/// Parameterless mask toggle.
pub type Toggle = Arc<dyn Fn() + Send + Sync>;
/// Dialog channel receiving the message text.
pub type Notify = Arc<dyn Fn(&str) + Send + Sync>;

/// Loading-indicator toggles shown around each network call.
#[derive(Clone)]
pub struct Mask {
    show: Toggle,
    hide: Toggle,
}

impl Mask {
    pub fn new(
        show: impl Fn() + Send + Sync + 'static,
        hide: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            show: Arc::new(show),
            hide: Arc::new(hide),
        }
    }

    pub fn show(&self) {
        (self.show)()
    }

    pub fn hide(&self) {
        (self.hide)()
    }
}

impl Default for Mask {
    fn default() -> Self {
        Self::new(|| {}, || {})
    }
}

/// User-facing message channels.
#[derive(Clone)]
pub struct Dialog {
    alert: Notify,
    error: Notify,
    tips: Notify,
}

impl Dialog {
    /// Build a dialog; `error` and `tips` fall back to `alert` when omitted.
    pub fn new(alert: Notify, error: Option<Notify>, tips: Option<Notify>) -> Self {
        Self {
            error: error.unwrap_or_else(|| Arc::clone(&alert)),
            tips: tips.unwrap_or_else(|| Arc::clone(&alert)),
            alert,
        }
    }

    pub fn alert(&self, msg: &str) {
        (self.alert)(msg)
    }

    pub fn error(&self, msg: &str) {
        (self.error)(msg)
    }

    pub fn tips(&self, msg: &str) {
        (self.tips)(msg)
    }
}

impl Default for Dialog {
    fn default() -> Self {
        Self::new(
            Arc::new(|msg: &str| warn!(target: "apiclient::dialog", "alert: {msg}")),
            Some(Arc::new(|msg: &str| warn!(target: "apiclient::dialog", "error: {msg}"))),
            Some(Arc::new(|msg: &str| info!(target: "apiclient::dialog", "tips: {msg}"))),
        )
    }
}

/// Declarative startup settings, loadable from TOML or the environment.
///
/// Every present field is fed through the matching validating setter by
/// [`ClientConfig::apply`], so invalid values are rejected the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: Option<String>,
    pub method: Option<String>,
    pub response_format: Option<String>,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub error_page: Option<String>,
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }

    /// Read `APICLIENT_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("APICLIENT_HOST"),
            method: lookup("APICLIENT_METHOD"),
            response_format: lookup("APICLIENT_FORMAT"),
            token: lookup("APICLIENT_TOKEN"),
            user_id: lookup("APICLIENT_USER_ID"),
            error_page: lookup("APICLIENT_ERROR_PAGE"),
        }
    }
}

/// Everything a request reads from the shared store.
#[derive(Clone)]
pub struct ClientConfig {
    host: Option<String>,
    method: RequestMethod,
    response_format: ResponseFormat,
    token: Option<String>,
    user_id: Option<String>,
    error_page: String,
    mask: Mask,
    dialog: Dialog,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: None,
            method: RequestMethod::default(),
            response_format: ResponseFormat::default(),
            token: None,
            user_id: None,
            error_page: DEFAULT_ERROR_PAGE.to_string(),
            mask: Mask::default(),
            dialog: Dialog::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("method", &self.method)
            .field("response_format", &self.response_format)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("error_page", &self.error_page)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn response_format(&self) -> ResponseFormat {
        self.response_format
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn error_page(&self) -> &str {
        &self.error_page
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    /// Store the host, appending a trailing `/` when it is missing.
    pub fn try_set_host(&mut self, host: &str) -> Result<(), ConfigError> {
        if host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        let mut host = host.to_string();
        if !host.ends_with('/') {
            host.push('/');
        }
        self.host = Some(host);
        Ok(())
    }

    pub fn set_host(&mut self, host: &str) -> &mut Self {
        if let Err(e) = self.try_set_host(host) {
            warn!("{e}");
        }
        self
    }

    pub fn try_set_method(&mut self, method: &str) -> Result<(), ConfigError> {
        self.method = method.parse()?;
        Ok(())
    }

    pub fn try_set_response_format(&mut self, format: &str) -> Result<(), ConfigError> {
        self.response_format = format.parse()?;
        Ok(())
    }

    /// Method and format are validated independently: an invalid method
    /// does not block a valid format, and vice versa.
    pub fn set_request_mode(&mut self, method: &str, format: &str) -> &mut Self {
        if let Err(e) = self.try_set_method(method) {
            warn!("{e}");
        }
        if let Err(e) = self.try_set_response_format(format) {
            warn!("{e}");
        }
        self
    }

    /// Both parts are required; a partial update is rejected as a whole.
    pub fn try_set_credentials(&mut self, token: &str, user_id: &str) -> Result<(), ConfigError> {
        if token.is_empty() {
            return Err(ConfigError::EmptyToken);
        }
        if user_id.is_empty() {
            return Err(ConfigError::EmptyUserId);
        }
        self.token = Some(token.to_string());
        self.user_id = Some(user_id.to_string());
        Ok(())
    }

    pub fn set_credentials(&mut self, token: &str, user_id: &str) -> &mut Self {
        if let Err(e) = self.try_set_credentials(token, user_id) {
            warn!("{e}");
        }
        self
    }

    /// Forget the current token and user id, e.g. after a session fault.
    pub fn clear_credentials(&mut self) -> &mut Self {
        self.token = None;
        self.user_id = None;
        self
    }

    pub fn set_mask(
        &mut self,
        show: impl Fn() + Send + Sync + 'static,
        hide: impl Fn() + Send + Sync + 'static,
    ) -> &mut Self {
        self.mask = Mask::new(show, hide);
        self
    }

    pub fn set_dialog(
        &mut self,
        alert: impl Fn(&str) + Send + Sync + 'static,
        error: Option<Notify>,
        tips: Option<Notify>,
    ) -> &mut Self {
        self.dialog = Dialog::new(Arc::new(alert), error, tips);
        self
    }

    pub fn try_set_error_page(&mut self, page: &str) -> Result<(), ConfigError> {
        if page.is_empty() {
            return Err(ConfigError::EmptyErrorPage);
        }
        self.error_page = page.to_string();
        Ok(())
    }

    pub fn set_error_page(&mut self, page: &str) -> &mut Self {
        if let Err(e) = self.try_set_error_page(page) {
            warn!("{e}");
        }
        self
    }

    /// Apply every field present in `settings` through its setter.
    pub fn apply(&mut self, settings: &Settings) -> &mut Self {
        if let Some(host) = &settings.host {
            self.set_host(host);
        }
        if let Some(method) = &settings.method {
            if let Err(e) = self.try_set_method(method) {
                warn!("{e}");
            }
        }
        if let Some(format) = &settings.response_format {
            if let Err(e) = self.try_set_response_format(format) {
                warn!("{e}");
            }
        }
        match (&settings.token, &settings.user_id) {
            (None, None) => {}
            (token, user_id) => {
                self.set_credentials(
                    token.as_deref().unwrap_or_default(),
                    user_id.as_deref().unwrap_or_default(),
                );
            }
        }
        if let Some(page) = &settings.error_page {
            self.set_error_page(page);
        }
        self
    }
}
