//! Ledger transport for the five-bells plugin.
//!
//! Provides the authenticated HTTP client boundary ([`LedgerApi`]), the
//! classification of ledger error responses, and the WebSocket notification
//! channel with its subscription bookkeeping.

pub mod api;
pub mod classify;
pub mod http;
pub mod notify;

pub use api::{BasicCredentials, LedgerApi};
pub use classify::classify_response;
pub use http::HttpLedgerClient;
pub use notify::{
    handle_frame, NotificationDispatcher, RpcIdSequence, SubscriptionChannel,
    WsNotificationChannel,
};
