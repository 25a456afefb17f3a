use async_trait::async_trait;
use bells_protocol::{AccountInfo, LedgerInfo, MessageDoc, TransferDoc};
use bells_types::PluginResult;

/// Basic-auth credential pair presented on every ledger HTTP call.
///
/// In factory mode these are the shared admin credentials; a standalone
/// plugin carries its own account credentials.
#[derive(Clone, Debug)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

/// Authenticated access to a five-bells ledger's HTTP API.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Fetch the ledger metadata document from `GET {base}/`.
    async fn ledger_info(&self, base_url: &str) -> PluginResult<LedgerInfo>;

    /// Fetch an account resource. A 404 surfaces as
    /// [`bells_types::PluginError::AccountNotFound`].
    async fn account_info(&self, account_url: &str) -> PluginResult<AccountInfo>;

    /// Fetch a bearer token for the notification WebSocket.
    async fn auth_token(&self, base_url: &str) -> PluginResult<String>;

    /// Submit a transfer document via `PUT` to its resource URL.
    async fn put_transfer(&self, transfer_url: &str, doc: &TransferDoc) -> PluginResult<()>;

    /// Submit a message document via `POST` to the ledger's message URL.
    async fn post_message(&self, message_url: &str, doc: &MessageDoc) -> PluginResult<()>;
}
