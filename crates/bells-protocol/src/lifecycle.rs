//! Transfer lifecycle classification.
//!
//! Each notification is classified independently from the resource snapshot
//! it carries; no prior state is stored. The table, keyed on the native
//! `state` plus the presence of condition/fulfillment fields:
//!
//! | state    | condition             | related fulfillment | credit leg rejected | outcome  |
//! |----------|-----------------------|---------------------|---------------------|----------|
//! | prepared | —                     | —                   | —                   | Prepare  |
//! | executed | execution_condition   | execution           | —                   | Fulfill  |
//! | executed | none                  | —                   | —                   | Execute  |
//! | rejected | cancellation_condition| cancellation        | —                   | Cancel   |
//! | rejected | none                  | —                   | yes, with message   | Reject   |
//! | rejected | none                  | —                   | no                  | Cancel   |
//!
//! At most one outcome per notification; `proposed` (and anything not in
//! the table) yields none.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bells_types::{PluginEvent, Transfer};

use crate::document::{FundsLeg, RelatedResources, TransferDoc, TransferState};

/// The single event a notified transfer snapshot maps to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Prepare,
    Execute,
    Fulfill { fulfillment: String },
    Cancel { fulfillment: Option<String> },
    Reject { reason: String },
}

/// Classify a transfer snapshot against the lifecycle table.
///
/// `credit_leg` is the payee-side leg of the local participation, as
/// resolved by the transfer translator.
pub fn classify(
    doc: &TransferDoc,
    related: &RelatedResources,
    credit_leg: &FundsLeg,
) -> Option<LifecycleOutcome> {
    match doc.state? {
        TransferState::Proposed => None,
        TransferState::Prepared => Some(LifecycleOutcome::Prepare),
        TransferState::Executed => {
            match (&doc.execution_condition, &related.execution_condition_fulfillment) {
                (Some(_), Some(fulfillment)) => {
                    Some(LifecycleOutcome::Fulfill { fulfillment: fulfillment.clone() })
                }
                _ => Some(LifecycleOutcome::Execute),
            }
        }
        TransferState::Rejected => Some(classify_rejection(doc, related, credit_leg)),
    }
}

fn classify_rejection(
    doc: &TransferDoc,
    related: &RelatedResources,
    credit_leg: &FundsLeg,
) -> LifecycleOutcome {
    if doc.cancellation_condition.is_some() {
        if let Some(fulfillment) = &related.cancellation_condition_fulfillment {
            return LifecycleOutcome::Cancel { fulfillment: Some(fulfillment.clone()) };
        }
    }
    if credit_leg.rejected == Some(true) {
        if let Some(reason) = credit_leg.rejection_message.as_deref().and_then(decode_reason) {
            return LifecycleOutcome::Reject { reason };
        }
    }
    LifecycleOutcome::Cancel { fulfillment: None }
}

/// Decode a base64 rejection message. An undecodable message degrades to a
/// plain cancel rather than surfacing garbage.
fn decode_reason(encoded: &str) -> Option<String> {
    let bytes = BASE64.decode(encoded).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Pair an outcome with its transfer to form the emitted event.
pub fn into_event(outcome: LifecycleOutcome, transfer: Transfer) -> PluginEvent {
    match outcome {
        LifecycleOutcome::Prepare => PluginEvent::Prepare(transfer),
        LifecycleOutcome::Execute => PluginEvent::Execute(transfer),
        LifecycleOutcome::Fulfill { fulfillment } => PluginEvent::Fulfill { transfer, fulfillment },
        LifecycleOutcome::Cancel { fulfillment } => PluginEvent::Cancel { transfer, fulfillment },
        LifecycleOutcome::Reject { reason } => PluginEvent::Reject { transfer, reason },
    }
}
