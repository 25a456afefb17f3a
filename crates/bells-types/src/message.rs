use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in its generic, ledger-agnostic form.
///
/// Outbound messages name their recipient in `to` (preferred) or `account`;
/// inbound messages always arrive with `account` set to the counterparty.
/// `ledger` must equal the plugin's configured prefix or the message is
/// rejected, never translated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Message {
    /// An outbound message to `account` on `ledger`.
    pub fn new(ledger: impl Into<String>, account: impl Into<String>, data: Value) -> Self {
        Self {
            ledger: Some(ledger.into()),
            account: Some(account.into()),
            to: None,
            from: None,
            data: Some(data),
        }
    }

    /// The destination address: `to` when present, `account` otherwise.
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref().or(self.account.as_deref())
    }
}
