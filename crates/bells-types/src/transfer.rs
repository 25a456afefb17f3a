use serde::{Deserialize, Serialize};

/// Which side of a transfer the local account occupies.
///
/// `Incoming` when the local account is the credit (payee) leg, `Outgoing`
/// when it is the debit (payer) leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    /// The event-name prefix for this direction (`incoming` / `outgoing`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transfer in its generic, ledger-agnostic form.
///
/// `id` is a bare UUID; the ledger-native resource URL carries the same UUID
/// as its final path segment. `account` is always the counterparty address
/// in ledger-prefixed form. Amounts are decimal strings, expiry timestamps
/// are carried verbatim as ISO-8601 text, and conditions/fulfillments are
/// opaque tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub direction: Direction,
    /// The ledger prefix this transfer belongs to.
    pub ledger: String,
    /// Counterparty address, ledger-prefixed.
    pub account: String,
    pub amount: String,
    #[serde(rename = "expiresAt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(rename = "executionCondition", skip_serializing_if = "Option::is_none")]
    pub execution_condition: Option<String>,
    #[serde(rename = "cancellationCondition", skip_serializing_if = "Option::is_none")]
    pub cancellation_condition: Option<String>,
}

impl Transfer {
    pub fn new(
        id: impl Into<String>,
        direction: Direction,
        ledger: impl Into<String>,
        account: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            direction,
            ledger: ledger.into(),
            account: account.into(),
            amount: amount.into(),
            expires_at: None,
            execution_condition: None,
            cancellation_condition: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: impl Into<String>) -> Self {
        self.expires_at = Some(expires_at.into());
        self
    }

    pub fn with_execution_condition(mut self, condition: impl Into<String>) -> Self {
        self.execution_condition = Some(condition.into());
        self
    }

    pub fn with_cancellation_condition(mut self, condition: impl Into<String>) -> Self {
        self.cancellation_condition = Some(condition.into());
        self
    }
}
