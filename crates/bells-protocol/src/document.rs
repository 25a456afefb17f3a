//! Ledger-native resource documents.
//!
//! These structs mirror the ledger's JSON representations byte-for-byte:
//! optional fields are omitted when absent so submitted bodies match what
//! the ledger expects, and unknown inbound fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state reported in a native transfer resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    Proposed,
    Prepared,
    Executed,
    Rejected,
}

/// One debit or credit leg of a native transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsLeg {
    pub account: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<bool>,
    /// Base64-encoded rejection reason, set by a rejecting payee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_message: Option<String>,
}

impl FundsLeg {
    pub fn new(account: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            amount: amount.into(),
            authorized: None,
            rejected: None,
            rejection_message: None,
        }
    }

    pub fn authorized(mut self) -> Self {
        self.authorized = Some(true);
        self
    }
}

/// A transfer as the ledger represents it.
///
/// `id` is a full resource URL whose final path segment is the transfer
/// UUID. Exactly one debit and one credit leg are relevant to a given local
/// account; other legs are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDoc {
    pub id: String,
    pub ledger: String,
    pub debits: Vec<FundsLeg>,
    pub credits: Vec<FundsLeg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TransferState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_condition: Option<String>,
}

impl TransferDoc {
    /// The bare UUID: the final path segment of the resource URL.
    pub fn uuid(&self) -> &str {
        bells_types::address::account_name(&self.id)
    }
}

/// Resources related to a transfer notification, e.g. fulfillments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_condition_fulfillment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_condition_fulfillment: Option<String>,
}

/// A message as the ledger represents it.
///
/// Outbound documents always carry `from`/`to`; inbound documents may name
/// the recipient in `to` or (older ledgers) `account`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDoc {
    pub ledger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl MessageDoc {
    /// The recipient account URL: `to` when present, `account` otherwise.
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref().or(self.account.as_deref())
    }
}

/// Endpoint overrides advertised in the ledger's metadata document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub websocket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// Ledger metadata fetched from `GET {base}/`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<LedgerUrls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
}

impl LedgerInfo {
    /// The message submission URL: metadata override or `{base}/messages`.
    pub fn message_url(&self, base: &str) -> String {
        self.urls
            .as_ref()
            .and_then(|u| u.message.clone())
            .unwrap_or_else(|| format!("{}/messages", base.trim_end_matches('/')))
    }

    /// The transfer resource URL for a given UUID: metadata `:id` template
    /// or `{base}/transfers/{id}`.
    pub fn transfer_url(&self, base: &str, id: &str) -> String {
        match self.urls.as_ref().and_then(|u| u.transfer.as_deref()) {
            Some(template) if template.contains(":id") => template.replace(":id", id),
            _ => format!("{}/transfers/{}", base.trim_end_matches('/'), id),
        }
    }

    /// The notification endpoint: metadata override or the ledger base with
    /// its scheme switched to WebSocket and `/websocket` appended.
    pub fn websocket_url(&self, base: &str) -> String {
        if let Some(url) = self.urls.as_ref().and_then(|u| u.websocket.clone()) {
            return url;
        }
        let base = base.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}/websocket")
    }
}

/// Account metadata fetched from `GET {base}/accounts/{name}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// The owning ledger's base URL.
    pub ledger: String,
    pub name: String,
}
