//! The JSON-RPC 2.0 notification envelope.
//!
//! Outbound: `subscribe_account` requests with a monotonically increasing
//! request id. Inbound: `notify` calls and the `{type: "connect"}` greeting.
//! Replies are `{"result":"processed"}` or
//! `{"result":"ignored","ignoreReason":{"id":...,"message":...}}`.
//!
//! Malformed frames never raise: an unparseable frame or one without a
//! recognizable `type`/`method` maps to [`InboundMessage::parse`] returning
//! `None` (no reply, no crash).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{MessageDoc, RelatedResources, TransferDoc};

pub const JSONRPC_VERSION: &str = "2.0";

pub const EVENT_TRANSFER_UPDATE: &str = "transfer.update";
pub const EVENT_MESSAGE_SEND: &str = "message.send";

/// Outbound `subscribe_account` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: SubscribeParams,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscribeParams {
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub accounts: Vec<String>,
}

impl SubscribeRequest {
    /// Subscribe to every event type for the given account URLs.
    pub fn new(id: u64, accounts: Vec<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: "subscribe_account".to_string(),
            params: SubscribeParams { event_type: "*".to_string(), accounts },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("subscribe request serializes")
    }
}

/// A recognized inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundMessage {
    /// The ledger's `{type: "connect"}` greeting; acknowledged `processed`.
    Connect,
    /// A JSON-RPC `notify` call, event not yet validated.
    Notify(NotifyParams),
}

/// Raw `notify` parameters before event-specific decoding.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NotifyParams {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub resource: Value,
    #[serde(default)]
    pub related_resources: Option<Value>,
}

impl InboundMessage {
    /// Parse a text frame. Returns `None` for invalid JSON or envelopes
    /// without a recognizable `type`/`method` — those are ignored silently.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        if value.get("type").and_then(Value::as_str) == Some("connect") {
            return Some(Self::Connect);
        }
        if value.get("method").and_then(Value::as_str) == Some("notify") {
            let params = value.get("params").cloned().unwrap_or(Value::Null);
            let params: NotifyParams = serde_json::from_value(params).unwrap_or_default();
            return Some(Self::Notify(params));
        }
        None
    }
}

/// A decoded, recognized notification.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    TransferUpdate { transfer: TransferDoc, related: RelatedResources },
    MessageSend { message: MessageDoc },
}

impl Notification {
    /// Decode `notify` params into a typed notification.
    ///
    /// Unknown events and undecodable resources yield an [`IgnoreReason`]
    /// for the reply; they never raise.
    pub fn decode(params: NotifyParams) -> Result<Self, IgnoreReason> {
        match params.event.as_str() {
            EVENT_TRANSFER_UPDATE => {
                let transfer: TransferDoc = serde_json::from_value(params.resource)
                    .map_err(|_| IgnoreReason::unrelated())?;
                let related = params
                    .related_resources
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default();
                Ok(Self::TransferUpdate { transfer, related })
            }
            EVENT_MESSAGE_SEND => {
                let message: MessageDoc = serde_json::from_value(params.resource)
                    .map_err(|_| IgnoreReason::unrelated())?;
                Ok(Self::MessageSend { message })
            }
            other => Err(IgnoreReason::invalid_event(other)),
        }
    }
}

/// Why a notification was ignored, echoed back to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreReason {
    pub id: String,
    pub message: String,
}

impl IgnoreReason {
    /// No registered account participates in the notified resource.
    pub fn unrelated() -> Self {
        Self {
            id: "UnrelatedNotificationError".to_string(),
            message: "Notification does not seem related to connector".to_string(),
        }
    }

    /// The notification carried an event this plugin does not recognize.
    pub fn invalid_event(event: &str) -> Self {
        Self {
            id: "UnrelatedNotificationError".to_string(),
            message: format!("Invalid notification event: {event}"),
        }
    }
}

/// Verdict of dispatching a notification to the plugin layer.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchVerdict {
    Processed,
    Ignored(IgnoreReason),
}

impl DispatchVerdict {
    pub fn into_reply(self) -> RpcReply {
        match self {
            Self::Processed => RpcReply::processed(),
            Self::Ignored(reason) => RpcReply::ignored(reason),
        }
    }
}

/// Reply body sent back over the socket for each handled notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcReply {
    pub result: String,
    #[serde(rename = "ignoreReason", skip_serializing_if = "Option::is_none")]
    pub ignore_reason: Option<IgnoreReason>,
}

impl RpcReply {
    pub fn processed() -> Self {
        Self { result: "processed".to_string(), ignore_reason: None }
    }

    pub fn ignored(reason: IgnoreReason) -> Self {
        Self { result: "ignored".to_string(), ignore_reason: Some(reason) }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("rpc reply serializes")
    }
}
