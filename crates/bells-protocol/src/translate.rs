//! Field translation between the generic model and ledger-native documents.
//!
//! Translators are pure: they carry the ledger base URL, the address prefix,
//! and the local account URL, and never perform I/O. Validation failures are
//! raised synchronously, before anything touches the network.

use bells_types::address::{to_generic_address, to_ledger_account};
use bells_types::{Direction, Message, PluginError, PluginResult, Transfer};
use uuid::Uuid;

use crate::document::{FundsLeg, MessageDoc, TransferDoc};

/// The local account's view of a notified transfer.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferView {
    pub transfer: Transfer,
    /// The payee-side leg of the local participation: the local credit leg
    /// for incoming transfers, the counterparty credit leg for outgoing.
    pub credit_leg: FundsLeg,
}

/// Converts generic transfers to and from native transfer documents.
#[derive(Clone, Debug)]
pub struct TransferTranslator {
    ledger_base: String,
    prefix: String,
    local_account: String,
}

impl TransferTranslator {
    pub fn new(
        ledger_base: impl Into<String>,
        prefix: impl Into<String>,
        local_account: impl Into<String>,
    ) -> Self {
        Self {
            ledger_base: ledger_base.into(),
            prefix: prefix.into(),
            local_account: local_account.into(),
        }
    }

    /// Build the native document for submission, with legs ordered
    /// `[payer, payee]`.
    ///
    /// An outgoing transfer debits the local account (carrying the
    /// `authorized` flag) and credits the counterparty; an incoming transfer
    /// reverses the legs and sets no authorization.
    pub fn to_ledger(&self, transfer: &Transfer, resource_url: &str) -> PluginResult<TransferDoc> {
        Uuid::parse_str(&transfer.id)
            .map_err(|_| PluginError::InvalidFields("invalid id".to_string()))?;
        if transfer.amount.is_empty() {
            return Err(PluginError::InvalidFields("invalid amount".to_string()));
        }
        let counterparty =
            to_ledger_account(&self.ledger_base, &self.prefix, &transfer.account)?;

        let local = FundsLeg::new(self.local_account.clone(), transfer.amount.clone());
        let remote = FundsLeg::new(counterparty, transfer.amount.clone());
        let (debits, credits) = match transfer.direction {
            Direction::Outgoing => (vec![local.authorized()], vec![remote]),
            Direction::Incoming => (vec![remote], vec![local]),
        };

        Ok(TransferDoc {
            id: resource_url.to_string(),
            ledger: self.ledger_base.clone(),
            debits,
            credits,
            state: None,
            expires_at: transfer.expires_at.clone(),
            execution_condition: transfer.execution_condition.clone(),
            cancellation_condition: transfer.cancellation_condition.clone(),
        })
    }

    /// Resolve the local account's participation in a notified transfer.
    ///
    /// Returns `None` when the local account appears on neither leg — the
    /// notification is unrelated. Legs beyond the local participation pair
    /// are ignored.
    pub fn from_ledger(&self, doc: &TransferDoc) -> Option<TransferView> {
        if let Some(idx) = self.leg_index(&doc.credits) {
            let payer = doc.debits.get(idx).or_else(|| doc.debits.first())?;
            return Some(TransferView {
                transfer: self.generic(doc, Direction::Incoming, &payer.account, &doc.credits[idx]),
                credit_leg: doc.credits[idx].clone(),
            });
        }
        if let Some(idx) = self.leg_index(&doc.debits) {
            let payee = doc.credits.get(idx).or_else(|| doc.credits.first())?;
            return Some(TransferView {
                transfer: self.generic(doc, Direction::Outgoing, &payee.account, &doc.debits[idx]),
                credit_leg: payee.clone(),
            });
        }
        None
    }

    fn leg_index(&self, legs: &[FundsLeg]) -> Option<usize> {
        legs.iter().position(|leg| leg.account == self.local_account)
    }

    fn generic(
        &self,
        doc: &TransferDoc,
        direction: Direction,
        counterparty_url: &str,
        local_leg: &FundsLeg,
    ) -> Transfer {
        Transfer {
            id: doc.uuid().to_string(),
            direction,
            ledger: self.prefix.clone(),
            account: to_generic_address(&self.prefix, counterparty_url),
            amount: local_leg.amount.clone(),
            expires_at: doc.expires_at.clone(),
            execution_condition: doc.execution_condition.clone(),
            cancellation_condition: doc.cancellation_condition.clone(),
        }
    }
}

/// Converts generic messages to and from native message documents.
#[derive(Clone, Debug)]
pub struct MessageTranslator {
    ledger_base: String,
    prefix: String,
    local_account: String,
}

impl MessageTranslator {
    pub fn new(
        ledger_base: impl Into<String>,
        prefix: impl Into<String>,
        local_account: impl Into<String>,
    ) -> Self {
        Self {
            ledger_base: ledger_base.into(),
            prefix: prefix.into(),
            local_account: local_account.into(),
        }
    }

    /// Validate a caller-supplied message. The error texts are part of the
    /// public contract.
    pub fn validate(&self, message: &Message) -> PluginResult<()> {
        if message.recipient().is_none() {
            return Err(PluginError::InvalidFields("invalid to field".to_string()));
        }
        match message.ledger.as_deref() {
            Some(ledger) if ledger == self.prefix => {}
            _ => return Err(PluginError::InvalidFields("invalid ledger".to_string())),
        }
        if message.data.is_none() {
            return Err(PluginError::InvalidFields("invalid data".to_string()));
        }
        Ok(())
    }

    /// Build the native document. `from` is the local account unless the
    /// caller set it explicitly for on-behalf-of flows.
    pub fn to_ledger(&self, message: &Message) -> PluginResult<MessageDoc> {
        self.validate(message)?;
        let recipient = message.recipient().expect("validated above");
        let to = to_ledger_account(&self.ledger_base, &self.prefix, recipient)?;
        let from = match message.from.as_deref() {
            Some(from) => to_ledger_account(&self.ledger_base, &self.prefix, from)?,
            None => self.local_account.clone(),
        };
        Ok(MessageDoc {
            ledger: self.ledger_base.clone(),
            from: Some(from),
            to: Some(to),
            account: None,
            data: message.data.clone(),
        })
    }

    /// Translate an inbound native message; `account` is always the
    /// counterparty. Returns `None` when the sender cannot be resolved.
    pub fn from_ledger(&self, doc: &MessageDoc) -> Option<Message> {
        let from = doc.from.as_deref()?;
        Some(Message {
            ledger: Some(self.prefix.clone()),
            account: Some(to_generic_address(&self.prefix, from)),
            to: None,
            from: None,
            data: doc.data.clone(),
        })
    }
}
