use async_trait::async_trait;
use bells_protocol::{AccountInfo, LedgerInfo, MessageDoc, TransferDoc};
use bells_types::{PluginError, PluginResult};
use serde::Deserialize;
use tracing::debug;

use crate::api::{BasicCredentials, LedgerApi};
use crate::classify::classify_response;

/// `reqwest`-backed [`LedgerApi`] implementation.
///
/// Every call carries the configured basic-auth credentials. Transport
/// failures surface as [`PluginError::Transport`]; ledger-reported errors
/// are classified against the taxonomy.
pub struct HttpLedgerClient {
    http: reqwest::Client,
    credentials: BasicCredentials,
}

#[derive(Debug, Deserialize)]
struct AuthTokenBody {
    token: String,
}

impl HttpLedgerClient {
    pub fn new(credentials: BasicCredentials) -> Self {
        Self { http: reqwest::Client::new(), credentials }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    async fn check(response: reqwest::Response) -> PluginResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = classify_response(status.as_u16(), &body);
        debug!(status = status.as_u16(), kind = ?err.kind(), "ledger call failed");
        Err(err)
    }
}

fn transport(err: reqwest::Error) -> PluginError {
    PluginError::Transport(err.to_string())
}

#[async_trait]
impl LedgerApi for HttpLedgerClient {
    async fn ledger_info(&self, base_url: &str) -> PluginResult<LedgerInfo> {
        let response = self
            .request(reqwest::Method::GET, base_url)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await?.json().await.map_err(transport)
    }

    async fn account_info(&self, account_url: &str) -> PluginResult<AccountInfo> {
        let response = self
            .request(reqwest::Method::GET, account_url)
            .send()
            .await
            .map_err(transport)?;
        if response.status().as_u16() == 404 {
            return Err(PluginError::AccountNotFound(format!(
                "account not found: {account_url}"
            )));
        }
        Self::check(response).await?.json().await.map_err(transport)
    }

    async fn auth_token(&self, base_url: &str) -> PluginResult<String> {
        let url = format!("{}/auth_token", base_url.trim_end_matches('/'));
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(transport)?;
        let body: AuthTokenBody = Self::check(response).await?.json().await.map_err(transport)?;
        Ok(body.token)
    }

    async fn put_transfer(&self, transfer_url: &str, doc: &TransferDoc) -> PluginResult<()> {
        let response = self
            .request(reqwest::Method::PUT, transfer_url)
            .json(doc)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await.map(|_| ())
    }

    async fn post_message(&self, message_url: &str, doc: &MessageDoc) -> PluginResult<()> {
        let response = self
            .request(reqwest::Method::POST, message_url)
            .json(doc)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await.map(|_| ())
    }
}
