//! The per-account plugin facade.
//!
//! A plugin binds one ledger account to the generic transfer/message
//! interface: it translates outbound calls into ledger documents, routes
//! inbound notifications through the lifecycle table, and emits typed
//! events to registered handlers.
//!
//! Standalone plugins own their notification channel and perform the full
//! connect flow themselves; factory-created plugins attach to the factory's
//! shared channel and are born connected.

use std::sync::{Arc, RwLock, Weak};

use async_trait::async_trait;
use tracing::{debug, info};

use bells_client::{
    BasicCredentials, HttpLedgerClient, LedgerApi, NotificationDispatcher, SubscriptionChannel,
    WsNotificationChannel,
};
use bells_protocol::{
    classify, into_event, DispatchVerdict, IgnoreReason, LedgerInfo, MessageTranslator,
    Notification, TransferTranslator,
};
use bells_types::{EventName, Message, PluginError, PluginEvent, PluginResult, Transfer};

use crate::events::{EventRouter, Subscription};

/// Static identity of a plugin: its ledger prefix and account URL.
#[derive(Clone, Debug)]
pub struct PluginConfig {
    /// The ledger-scoped address namespace, e.g. `example.red.`.
    pub prefix: String,
    /// The local account's resource URL.
    pub account: String,
}

/// State resolved at connect time from the ledger's metadata.
struct Session {
    ledger_base: String,
    username: String,
    message_url: String,
    info: LedgerInfo,
    transfers: TransferTranslator,
    messages: MessageTranslator,
}

impl Session {
    fn new(config: &PluginConfig, ledger_base: String, username: String, info: LedgerInfo) -> Self {
        let message_url = info.message_url(&ledger_base);
        let transfers = TransferTranslator::new(&ledger_base, &config.prefix, &config.account);
        let messages = MessageTranslator::new(&ledger_base, &config.prefix, &config.account);
        Self { ledger_base, username, message_url, info, transfers, messages }
    }
}

pub struct Plugin {
    config: PluginConfig,
    client: Arc<dyn LedgerApi>,
    channel: Arc<dyn SubscriptionChannel>,
    owns_channel: bool,
    events: EventRouter,
    session: RwLock<Option<Session>>,
    /// Back-reference handed to the channel as the dispatcher.
    self_ref: Weak<Plugin>,
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("config", &self.config)
            .field("owns_channel", &self.owns_channel)
            .finish_non_exhaustive()
    }
}

impl Plugin {
    /// A standalone plugin owning its notification channel.
    pub fn new(
        config: PluginConfig,
        client: Arc<dyn LedgerApi>,
        channel: Arc<dyn SubscriptionChannel>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            config,
            client,
            channel,
            owns_channel: true,
            events: EventRouter::new(),
            session: RwLock::new(None),
            self_ref: self_ref.clone(),
        })
    }

    /// A standalone plugin backed by the real HTTP client and WebSocket
    /// channel, authenticated with the account's own credentials.
    pub fn from_credentials(config: PluginConfig, credentials: BasicCredentials) -> Arc<Self> {
        Self::new(
            config,
            Arc::new(HttpLedgerClient::new(credentials)),
            Arc::new(WsNotificationChannel::new()),
        )
    }

    /// A factory-created plugin sharing the factory's channel, with its
    /// session pre-resolved. Born connected.
    pub(crate) fn attached(
        config: PluginConfig,
        client: Arc<dyn LedgerApi>,
        channel: Arc<dyn SubscriptionChannel>,
        ledger_base: String,
        username: String,
        info: LedgerInfo,
    ) -> Arc<Self> {
        let session = Session::new(&config, ledger_base, username, info);
        Arc::new_cyclic(|self_ref| Self {
            config,
            client,
            channel,
            owns_channel: false,
            events: EventRouter::new(),
            session: RwLock::new(Some(session)),
            self_ref: self_ref.clone(),
        })
    }

    /// The local account's resource URL.
    pub fn account(&self) -> &str {
        &self.config.account
    }

    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Resolve the ledger, obtain an auth token, and open the notification
    /// channel. Idempotent: connecting while connected is a no-op.
    pub async fn connect(&self) -> PluginResult<()> {
        if self.is_connected() {
            debug!(account = %self.config.account, "already connected");
            return Ok(());
        }
        let account = self.client.account_info(&self.config.account).await?;
        let ledger_info = self.client.ledger_info(&account.ledger).await?;
        let token = self.client.auth_token(&account.ledger).await?;
        let ws_url = ledger_info.websocket_url(&account.ledger);

        let dispatcher: Arc<dyn NotificationDispatcher> =
            self.self_ref.upgrade().expect("plugin is alive while borrowed");
        self.channel.connect(&ws_url, &token, dispatcher).await?;
        self.channel.subscribe(vec![self.config.account.clone()]).await?;

        let session = Session::new(&self.config, account.ledger, account.name, ledger_info);
        info!(account = %self.config.account, username = %session.username, "plugin connected");
        *self.session.write().expect("session lock poisoned") = Some(session);
        Ok(())
    }

    /// Close the owned channel (standalone mode) and drop session state.
    pub async fn disconnect(&self) {
        if self.owns_channel {
            self.channel.disconnect().await;
        }
        *self.session.write().expect("session lock poisoned") = None;
    }

    pub fn is_connected(&self) -> bool {
        self.session.read().expect("session lock poisoned").is_some()
            && self.channel.is_connected()
    }

    /// Register a handler for a named event. See [`EventRouter`].
    pub fn subscribe<F>(&self, name: EventName, handler: F) -> Subscription
    where
        F: Fn(&PluginEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(name, handler)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.events.unsubscribe(subscription);
    }

    /// Translate and submit a transfer via `PUT` to its resource URL.
    pub async fn send_transfer(&self, transfer: &Transfer) -> PluginResult<()> {
        let (url, doc) = {
            let guard = self.session.read().expect("session lock poisoned");
            let session = guard
                .as_ref()
                .filter(|_| self.channel.is_connected())
                .ok_or_else(|| PluginError::not_connected("sendTransfer"))?;
            let url = session.info.transfer_url(&session.ledger_base, &transfer.id);
            let doc = session.transfers.to_ledger(transfer, &url)?;
            (url, doc)
        };
        debug!(id = %transfer.id, "submitting transfer");
        self.client.put_transfer(&url, &doc).await
    }

    /// Validate, translate, and submit a message to the ledger's message
    /// endpoint.
    pub async fn send_message(&self, message: &Message) -> PluginResult<()> {
        let (url, doc) = {
            let guard = self.session.read().expect("session lock poisoned");
            let session = guard
                .as_ref()
                .filter(|_| self.channel.is_connected())
                .ok_or_else(|| PluginError::not_connected("sendMessage"))?;
            let doc = session.messages.to_ledger(message)?;
            (session.message_url.clone(), doc)
        };
        debug!(to = ?doc.to, "submitting message");
        self.client.post_message(&url, &doc).await
    }

    /// Route one decoded notification: translate, classify, emit.
    ///
    /// The returned verdict drives the channel's RPC reply. Unrelated
    /// resources are ignored; related resources that map to no lifecycle
    /// row (e.g. `proposed`) are acknowledged without an event.
    pub fn handle_notification(&self, notification: &Notification) -> DispatchVerdict {
        let event = {
            let guard = self.session.read().expect("session lock poisoned");
            let Some(session) = guard.as_ref() else {
                return DispatchVerdict::Ignored(IgnoreReason::unrelated());
            };
            match notification {
                Notification::TransferUpdate { transfer, related } => {
                    let Some(view) = session.transfers.from_ledger(transfer) else {
                        return DispatchVerdict::Ignored(IgnoreReason::unrelated());
                    };
                    match classify(transfer, related, &view.credit_leg) {
                        Some(outcome) => Some(into_event(outcome, view.transfer)),
                        None => None,
                    }
                }
                Notification::MessageSend { message } => {
                    if message.recipient() != Some(self.config.account.as_str()) {
                        return DispatchVerdict::Ignored(IgnoreReason::unrelated());
                    }
                    match session.messages.from_ledger(message) {
                        Some(inbound) => Some(PluginEvent::Message(inbound)),
                        None => return DispatchVerdict::Ignored(IgnoreReason::unrelated()),
                    }
                }
            }
        };
        if let Some(event) = event {
            debug!(event = %event.name(), account = %self.config.account, "emitting event");
            self.events.emit(&event);
        }
        DispatchVerdict::Processed
    }
}

#[async_trait]
impl NotificationDispatcher for Plugin {
    async fn dispatch(&self, notification: &Notification) -> DispatchVerdict {
        self.handle_notification(notification)
    }
}
