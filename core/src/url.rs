//! Endpoint resolution for the `controller/action` scheme.

use crate::error::AbortReason;

/// Join `host`, `controller` and `action` into an endpoint URL.
///
/// `host` is expected to end with `/`, which `ClientConfig::set_host`
/// guarantees. Empty parts count as missing.
pub fn resolve(host: Option<&str>, controller: &str, action: &str) -> Result<String, AbortReason> {
    if controller.is_empty() {
        return Err(AbortReason::MissingController);
    }
    if action.is_empty() {
        return Err(AbortReason::MissingAction);
    }
    let host = host.filter(|h| !h.is_empty()).ok_or(AbortReason::MissingHost)?;
    Ok(format!("{host}{controller}/{action}"))
}
