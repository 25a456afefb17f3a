//! Wire protocol for the five-bells ledger plugin.
//!
//! Defines the ledger-native resource documents, the JSON-RPC notification
//! envelope exchanged over the WebSocket channel, the bidirectional field
//! translation between generic and native representations, and the transfer
//! lifecycle classification table.

pub mod document;
pub mod lifecycle;
pub mod rpc;
pub mod translate;

pub use document::{
    AccountInfo, FundsLeg, LedgerInfo, LedgerUrls, MessageDoc, RelatedResources, TransferDoc,
    TransferState,
};
pub use lifecycle::{classify, into_event, LifecycleOutcome};
pub use rpc::{
    DispatchVerdict, IgnoreReason, InboundMessage, Notification, NotifyParams, RpcReply,
    SubscribeRequest, EVENT_MESSAGE_SEND, EVENT_TRANSFER_UPDATE,
};
pub use translate::{MessageTranslator, TransferTranslator, TransferView};
