//! Classification of ledger HTTP error responses.
//!
//! The ledger reports errors as `{id, message}` bodies. Classification maps
//! the body's `id` first, then falls back on the HTTP status, always
//! preserving the ledger's message text. Unclassified transport failures
//! (connection refused, unreadable responses) are surfaced by the HTTP
//! client as [`PluginError::Transport`], not here.

use bells_types::PluginError;
use serde::Deserialize;

/// The ledger's error body shape.
#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: String,
}

/// Map a non-success ledger response to the error taxonomy.
pub fn classify_response(status: u16, body: &str) -> PluginError {
    let parsed: ApiError = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.message.is_empty() {
        format!("ledger returned HTTP {status}")
    } else {
        parsed.message
    };

    match parsed.id.as_str() {
        "InvalidBodyError" => PluginError::InvalidFields(message),
        "NoSubscriptionsError" => PluginError::NoSubscriptions(message),
        _ if status == 400 => PluginError::InvalidFields(message),
        _ => PluginError::NotAccepted(message),
    }
}
