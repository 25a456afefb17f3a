//! Recording doubles for the ledger and channel boundaries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use bells_client::{
    LedgerApi, NotificationDispatcher, RpcIdSequence, SubscriptionChannel,
};
use bells_protocol::{
    AccountInfo, LedgerInfo, LedgerUrls, MessageDoc, SubscribeRequest, TransferDoc,
};
use bells_types::{PluginError, PluginEvent, PluginResult};

/// In-memory `LedgerApi` that records every call.
pub struct MockLedger {
    base: String,
    info: Mutex<LedgerInfo>,
    accounts: Mutex<HashMap<String, AccountInfo>>,
    account_calls: Mutex<Vec<String>>,
    transfers: Mutex<Vec<(String, TransferDoc)>>,
    messages: Mutex<Vec<(String, MessageDoc)>>,
    next_put_error: Mutex<Option<PluginError>>,
}

impl MockLedger {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            info: Mutex::new(LedgerInfo::default()),
            accounts: Mutex::new(HashMap::new()),
            account_calls: Mutex::new(Vec::new()),
            transfers: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            next_put_error: Mutex::new(None),
        }
    }

    pub fn add_account(&self, name: &str) {
        let url = format!("{}/accounts/{}", self.base, name);
        self.accounts.lock().unwrap().insert(
            url,
            AccountInfo { ledger: self.base.clone(), name: name.to_string() },
        );
    }

    pub fn set_message_url(&self, url: &str) {
        self.info.lock().unwrap().urls = Some(LedgerUrls {
            message: Some(url.to_string()),
            ..Default::default()
        });
    }

    pub fn fail_next_put(&self, err: PluginError) {
        *self.next_put_error.lock().unwrap() = Some(err);
    }

    /// How many times `account_info` was called for `url`.
    pub fn account_lookups(&self, url: &str) -> usize {
        self.account_calls.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }

    pub fn transfers(&self) -> Vec<(String, TransferDoc)> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<(String, MessageDoc)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerApi for MockLedger {
    async fn ledger_info(&self, _base_url: &str) -> PluginResult<LedgerInfo> {
        Ok(self.info.lock().unwrap().clone())
    }

    async fn account_info(&self, account_url: &str) -> PluginResult<AccountInfo> {
        self.account_calls.lock().unwrap().push(account_url.to_string());
        self.accounts
            .lock()
            .unwrap()
            .get(account_url)
            .cloned()
            .ok_or_else(|| PluginError::AccountNotFound(format!("account not found: {account_url}")))
    }

    async fn auth_token(&self, _base_url: &str) -> PluginResult<String> {
        Ok("abc".to_string())
    }

    async fn put_transfer(&self, transfer_url: &str, doc: &TransferDoc) -> PluginResult<()> {
        if let Some(err) = self.next_put_error.lock().unwrap().take() {
            return Err(err);
        }
        self.transfers.lock().unwrap().push((transfer_url.to_string(), doc.clone()));
        Ok(())
    }

    async fn post_message(&self, message_url: &str, doc: &MessageDoc) -> PluginResult<()> {
        self.messages.lock().unwrap().push((message_url.to_string(), doc.clone()));
        Ok(())
    }
}

/// Recording `SubscriptionChannel` that tracks connects and subscribe calls
/// with their JSON-RPC ids.
pub struct MockChannel {
    connected: AtomicBool,
    ids: RpcIdSequence,
    connects: Mutex<Vec<(String, String)>>,
    subscriptions: Mutex<Vec<SubscribeRequest>>,
    dispatcher: Mutex<Option<Arc<dyn NotificationDispatcher>>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            ids: RpcIdSequence::new(),
            connects: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            dispatcher: Mutex::new(None),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    pub fn subscriptions(&self) -> Vec<SubscribeRequest> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn dispatcher(&self) -> Option<Arc<dyn NotificationDispatcher>> {
        self.dispatcher.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriptionChannel for MockChannel {
    async fn connect(
        &self,
        ws_url: &str,
        token: &str,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> PluginResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.connects.lock().unwrap().push((ws_url.to_string(), token.to_string()));
        *self.dispatcher.lock().unwrap() = Some(dispatcher);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn subscribe(&self, accounts: Vec<String>) -> PluginResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(PluginError::not_connected("subscribe"));
        }
        self.subscriptions
            .lock()
            .unwrap()
            .push(SubscribeRequest::new(self.ids.next(), accounts));
        Ok(())
    }
}

/// An event-collecting handler plus the shared vector it fills.
#[allow(clippy::type_complexity)]
pub fn collector() -> (
    impl Fn(&PluginEvent) + Send + Sync + 'static,
    Arc<Mutex<Vec<PluginEvent>>>,
) {
    let seen: Arc<Mutex<Vec<PluginEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (move |event: &PluginEvent| sink.lock().unwrap().push(event.clone()), seen)
}
