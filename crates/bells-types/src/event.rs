use crate::message::Message;
use crate::transfer::{Direction, Transfer};

/// The names an application can subscribe to.
///
/// Ten transfer-lifecycle events (five per direction) plus inbound messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventName {
    IncomingPrepare,
    IncomingTransfer,
    IncomingFulfill,
    IncomingCancel,
    IncomingReject,
    OutgoingPrepare,
    OutgoingTransfer,
    OutgoingFulfill,
    OutgoingCancel,
    OutgoingReject,
    IncomingMessage,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncomingPrepare => "incoming_prepare",
            Self::IncomingTransfer => "incoming_transfer",
            Self::IncomingFulfill => "incoming_fulfill",
            Self::IncomingCancel => "incoming_cancel",
            Self::IncomingReject => "incoming_reject",
            Self::OutgoingPrepare => "outgoing_prepare",
            Self::OutgoingTransfer => "outgoing_transfer",
            Self::OutgoingFulfill => "outgoing_fulfill",
            Self::OutgoingCancel => "outgoing_cancel",
            Self::OutgoingReject => "outgoing_reject",
            Self::IncomingMessage => "incoming_message",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A domain event emitted by a plugin, with its payload.
#[derive(Clone, Debug, PartialEq)]
pub enum PluginEvent {
    /// A conditional transfer entered the `prepared` state.
    Prepare(Transfer),
    /// An unconditional transfer executed.
    Execute(Transfer),
    /// A conditional transfer executed; carries the execution fulfillment.
    Fulfill { transfer: Transfer, fulfillment: String },
    /// A transfer was cancelled, optionally via a cancellation fulfillment.
    Cancel { transfer: Transfer, fulfillment: Option<String> },
    /// The payee rejected the transfer; carries the decoded rejection reason.
    Reject { transfer: Transfer, reason: String },
    /// An inbound ledger message addressed to the local account.
    Message(Message),
}

impl PluginEvent {
    /// The subscription name this event is delivered under.
    pub fn name(&self) -> EventName {
        match self {
            Self::Prepare(t) => directional(t.direction, EventName::IncomingPrepare, EventName::OutgoingPrepare),
            Self::Execute(t) => directional(t.direction, EventName::IncomingTransfer, EventName::OutgoingTransfer),
            Self::Fulfill { transfer, .. } => {
                directional(transfer.direction, EventName::IncomingFulfill, EventName::OutgoingFulfill)
            }
            Self::Cancel { transfer, .. } => {
                directional(transfer.direction, EventName::IncomingCancel, EventName::OutgoingCancel)
            }
            Self::Reject { transfer, .. } => {
                directional(transfer.direction, EventName::IncomingReject, EventName::OutgoingReject)
            }
            Self::Message(_) => EventName::IncomingMessage,
        }
    }
}

fn directional(direction: Direction, incoming: EventName, outgoing: EventName) -> EventName {
    match direction {
        Direction::Incoming => incoming,
        Direction::Outgoing => outgoing,
    }
}
