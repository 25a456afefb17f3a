//! The multiplexing factory.
//!
//! One factory owns one notification channel authenticated with shared
//! admin credentials and a registry of per-account plugins keyed by
//! username. The account-existence check, registration, and resubscription
//! of `create` run under a single lock, so concurrent creates never issue
//! overlapping subscribe requests with stale account sets.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use bells_client::{
    BasicCredentials, HttpLedgerClient, LedgerApi, NotificationDispatcher, SubscriptionChannel,
    WsNotificationChannel,
};
use bells_protocol::{DispatchVerdict, IgnoreReason, LedgerInfo, Notification};
use bells_types::{PluginError, PluginResult};

use crate::plugin::{Plugin, PluginConfig};

/// Shared-credential configuration for a factory.
#[derive(Clone, Debug)]
pub struct FactoryConfig {
    /// The ledger-scoped address namespace, e.g. `example.red.`.
    pub prefix: String,
    pub admin_username: String,
    pub admin_password: String,
    /// The admin account's resource URL.
    pub admin_account: String,
}

/// Options for [`Factory::create`].
#[derive(Clone, Debug)]
pub struct CreateOptions {
    pub username: String,
}

#[derive(Clone)]
struct AdminSession {
    ledger_base: String,
    info: LedgerInfo,
}

struct FactoryState {
    session: Option<AdminSession>,
    plugins: HashMap<String, Arc<Plugin>>,
    /// Registration order; drives the subscription list.
    order: Vec<String>,
}

pub struct Factory {
    config: FactoryConfig,
    client: Arc<dyn LedgerApi>,
    channel: Arc<dyn SubscriptionChannel>,
    state: Mutex<FactoryState>,
    /// Back-reference handed to the channel as the dispatcher.
    self_ref: Weak<Factory>,
}

impl Factory {
    pub fn new(
        config: FactoryConfig,
        client: Arc<dyn LedgerApi>,
        channel: Arc<dyn SubscriptionChannel>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            config,
            client,
            channel,
            state: Mutex::new(FactoryState {
                session: None,
                plugins: HashMap::new(),
                order: Vec::new(),
            }),
            self_ref: self_ref.clone(),
        })
    }

    /// A factory backed by the real HTTP client and WebSocket channel,
    /// authenticated with the shared admin credentials.
    pub fn from_credentials(config: FactoryConfig) -> Arc<Self> {
        let credentials =
            BasicCredentials::new(config.admin_username.clone(), config.admin_password.clone());
        Self::new(
            config,
            Arc::new(HttpLedgerClient::new(credentials)),
            Arc::new(WsNotificationChannel::new()),
        )
    }

    /// Resolve the admin account, open the shared channel, and subscribe to
    /// the admin account. Idempotent.
    pub async fn connect(&self) -> PluginResult<()> {
        let mut state = self.state.lock().await;
        if state.session.is_some() && self.channel.is_connected() {
            debug!("factory already connected");
            return Ok(());
        }
        let account = self.client.account_info(&self.config.admin_account).await?;
        let ledger_info = self.client.ledger_info(&account.ledger).await?;
        let token = self.client.auth_token(&account.ledger).await?;
        let ws_url = ledger_info.websocket_url(&account.ledger);

        let dispatcher: Arc<dyn NotificationDispatcher> =
            self.self_ref.upgrade().expect("factory is alive while borrowed");
        self.channel.connect(&ws_url, &token, dispatcher).await?;
        self.channel.subscribe(vec![self.config.admin_account.clone()]).await?;

        info!(admin = %self.config.admin_username, ledger = %account.ledger, "factory connected");
        state.session = Some(AdminSession { ledger_base: account.ledger, info: ledger_info });
        Ok(())
    }

    pub async fn disconnect(&self) {
        self.channel.disconnect().await;
        self.state.lock().await.session = None;
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Create (or return the existing) plugin for `opts.username`.
    ///
    /// Verifies the account exists before registering; a nonexistent
    /// account rejects the call and registers nothing. Repeated calls for
    /// the same username return the identical plugin without re-checking or
    /// re-subscribing.
    pub async fn create(&self, opts: CreateOptions) -> PluginResult<Arc<Plugin>> {
        if !valid_username(&opts.username) {
            return Err(PluginError::InvalidFields("Invalid opts.username".to_string()));
        }
        let mut state = self.state.lock().await;
        let session = state
            .session
            .clone()
            .filter(|_| self.channel.is_connected())
            .ok_or_else(|| PluginError::not_connected("create"))?;

        if let Some(existing) = state.plugins.get(&opts.username) {
            return Ok(existing.clone());
        }

        let account_url = format!(
            "{}/accounts/{}",
            session.ledger_base.trim_end_matches('/'),
            opts.username
        );
        let account = self.client.account_info(&account_url).await?;

        let plugin = Plugin::attached(
            PluginConfig { prefix: self.config.prefix.clone(), account: account_url },
            self.client.clone(),
            self.channel.clone(),
            session.ledger_base.clone(),
            account.name,
            session.info.clone(),
        );
        state.plugins.insert(opts.username.clone(), plugin.clone());
        state.order.push(opts.username.clone());

        self.channel.subscribe(subscription_set(&self.config, &state)).await?;
        info!(username = %opts.username, "registered plugin");
        Ok(plugin)
    }

    /// Deregister the plugin for `username` and shrink the subscription set.
    pub async fn remove(&self, username: &str) -> PluginResult<()> {
        let mut state = self.state.lock().await;
        if state.plugins.remove(username).is_none() {
            return Ok(());
        }
        state.order.retain(|u| u != username);
        if state.session.is_some() && self.channel.is_connected() {
            self.channel.subscribe(subscription_set(&self.config, &state)).await?;
        }
        info!(username, "removed plugin");
        Ok(())
    }

    /// Look up a registered plugin by username.
    pub async fn plugin(&self, username: &str) -> Option<Arc<Plugin>> {
        self.state.lock().await.plugins.get(username).cloned()
    }
}

/// The full subscription list: admin account first, then every registered
/// plugin's account in registration order.
fn subscription_set(config: &FactoryConfig, state: &FactoryState) -> Vec<String> {
    let mut accounts = vec![config.admin_account.clone()];
    for username in &state.order {
        if let Some(plugin) = state.plugins.get(username) {
            accounts.push(plugin.account().to_string());
        }
    }
    accounts
}

/// Usernames are restricted to the ledger's account-name alphabet.
fn valid_username(name: &str) -> bool {
    (2..=256).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '-'))
}

#[async_trait]
impl NotificationDispatcher for Factory {
    /// Forward a notification to every registered plugin that participates
    /// in it; unrelated notifications are ignored.
    async fn dispatch(&self, notification: &Notification) -> DispatchVerdict {
        let plugins: Vec<Arc<Plugin>> = {
            let state = self.state.lock().await;
            state
                .order
                .iter()
                .filter_map(|username| state.plugins.get(username).cloned())
                .collect()
        };

        let mut processed = false;
        for plugin in &plugins {
            if plugin.handle_notification(notification) == DispatchVerdict::Processed {
                processed = true;
            }
        }
        if processed {
            DispatchVerdict::Processed
        } else {
            debug!("notification matched no registered plugin");
            DispatchVerdict::Ignored(IgnoreReason::unrelated())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{collector, MockChannel, MockLedger};
    use bells_protocol::{RelatedResources, TransferDoc};
    use bells_types::{Direction, ErrorKind, EventName, PluginEvent};
    use serde_json::json;

    const BASE: &str = "http://red.example";
    const PREFIX: &str = "example.red.";
    const ADMIN: &str = "http://red.example/accounts/admin";
    const MIKE: &str = "http://red.example/accounts/mike";
    const MARY: &str = "http://red.example/accounts/mary";

    fn setup() -> (Arc<Factory>, Arc<MockLedger>, Arc<MockChannel>) {
        let ledger = Arc::new(MockLedger::new(BASE));
        ledger.add_account("admin");
        ledger.add_account("mike");
        ledger.add_account("mary");
        let channel = Arc::new(MockChannel::new());
        let factory = Factory::new(
            FactoryConfig {
                prefix: PREFIX.into(),
                admin_username: "admin".into(),
                admin_password: "admin".into(),
                admin_account: ADMIN.into(),
            },
            ledger.clone(),
            channel.clone(),
        );
        (factory, ledger, channel)
    }

    fn transfer_notification(debit: &str, credit: &str) -> Notification {
        let doc: TransferDoc = serde_json::from_value(json!({
            "id": "http://red.example/transfers/ac518dfb-b8a6-49ef-b78d-5e26e81d7a45",
            "ledger": BASE,
            "debits": [{"account": debit, "amount": "10"}],
            "credits": [{"account": credit, "amount": "10"}],
            "state": "executed"
        }))
        .unwrap();
        Notification::TransferUpdate { transfer: doc, related: RelatedResources::default() }
    }

    #[tokio::test]
    async fn connect_subscribes_to_the_admin_account() {
        let (factory, _ledger, channel) = setup();
        factory.connect().await.unwrap();

        assert!(factory.is_connected());
        let subs = channel.subscriptions();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id, 1);
        assert_eq!(subs[0].params.accounts, vec![ADMIN.to_string()]);
    }

    #[tokio::test]
    async fn connect_twice_is_a_no_op() {
        let (factory, ledger, channel) = setup();
        factory.connect().await.unwrap();
        factory.connect().await.unwrap();

        assert!(factory.is_connected());
        assert_eq!(ledger.account_lookups(ADMIN), 1);
        assert_eq!(channel.connect_count(), 1);
        assert_eq!(channel.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn disconnect_closes_the_shared_channel() {
        let (factory, _ledger, _channel) = setup();
        factory.connect().await.unwrap();
        factory.disconnect().await;
        assert!(!factory.is_connected());
    }

    #[tokio::test]
    async fn create_registers_a_connected_plugin() {
        let (factory, ledger, _channel) = setup();
        factory.connect().await.unwrap();

        let plugin = factory.create(CreateOptions { username: "mike".into() }).await.unwrap();
        assert!(plugin.is_connected());
        assert_eq!(plugin.account(), MIKE);
        assert_eq!(ledger.account_lookups(MIKE), 1);
        assert!(factory.plugin("mike").await.is_some());
    }

    #[tokio::test]
    async fn create_is_deduplicated_per_username() {
        let (factory, ledger, channel) = setup();
        factory.connect().await.unwrap();

        let first = factory.create(CreateOptions { username: "mike".into() }).await.unwrap();
        let second = factory.create(CreateOptions { username: "mike".into() }).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ledger.account_lookups(MIKE), 1);
        // connect + first create; the duplicate create resubscribes nothing.
        assert_eq!(channel.subscriptions().len(), 2);
    }

    #[tokio::test]
    async fn subscriptions_accumulate_in_registration_order() {
        let (factory, _ledger, channel) = setup();
        factory.connect().await.unwrap();
        factory.create(CreateOptions { username: "mike".into() }).await.unwrap();
        factory.create(CreateOptions { username: "mary".into() }).await.unwrap();

        let subs = channel.subscriptions();
        assert_eq!(subs.len(), 3);
        assert_eq!(subs[1].id, 2);
        assert_eq!(subs[1].params.accounts, vec![ADMIN.to_string(), MIKE.to_string()]);
        assert_eq!(subs[2].id, 3);
        assert_eq!(
            subs[2].params.accounts,
            vec![ADMIN.to_string(), MIKE.to_string(), MARY.to_string()]
        );
        assert!(subs[1].id < subs[2].id);
    }

    #[tokio::test]
    async fn create_rejects_invalid_usernames() {
        let (factory, _ledger, _channel) = setup();
        factory.connect().await.unwrap();

        for bad in ["foo!", "a", "has space", "semi;colon"] {
            let err = factory
                .create(CreateOptions { username: bad.into() })
                .await
                .unwrap_err();
            assert_eq!(err, PluginError::InvalidFields("Invalid opts.username".into()));
        }
    }

    #[tokio::test]
    async fn create_rejects_nonexistent_accounts_without_registering() {
        let (factory, _ledger, channel) = setup();
        factory.connect().await.unwrap();

        let err = factory.create(CreateOptions { username: "bob".into() }).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountNotFound);
        assert!(factory.plugin("bob").await.is_none());
        // Only the connect-time subscription happened.
        assert_eq!(channel.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn create_requires_connection() {
        let (factory, _ledger, _channel) = setup();
        let err = factory.create(CreateOptions { username: "mike".into() }).await.unwrap_err();
        assert_eq!(err.to_string(), "Must be connected before create can be called");
    }

    #[tokio::test]
    async fn remove_deregisters_and_shrinks_the_subscription() {
        let (factory, _ledger, channel) = setup();
        factory.connect().await.unwrap();
        factory.create(CreateOptions { username: "mike".into() }).await.unwrap();
        factory.create(CreateOptions { username: "mary".into() }).await.unwrap();

        factory.remove("mike").await.unwrap();
        assert!(factory.plugin("mike").await.is_none());
        assert!(factory.plugin("mary").await.is_some());

        let subs = channel.subscriptions();
        let last = subs.last().unwrap();
        assert_eq!(last.id, 4);
        assert_eq!(last.params.accounts, vec![ADMIN.to_string(), MARY.to_string()]);
    }

    #[tokio::test]
    async fn remove_of_unknown_username_is_a_no_op() {
        let (factory, _ledger, channel) = setup();
        factory.connect().await.unwrap();
        factory.remove("ghost").await.unwrap();
        assert_eq!(channel.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn notifications_reach_the_owning_plugin() {
        let (factory, _ledger, _channel) = setup();
        factory.connect().await.unwrap();
        let mike = factory.create(CreateOptions { username: "mike".into() }).await.unwrap();
        let mary = factory.create(CreateOptions { username: "mary".into() }).await.unwrap();

        let (mike_events, mike_seen) = collector();
        mike.subscribe(EventName::IncomingTransfer, mike_events);
        let (mary_events, mary_seen) = collector();
        mary.subscribe(EventName::IncomingTransfer, mary_events);

        let verdict = factory
            .dispatch(&transfer_notification("http://red.example/accounts/alice", MIKE))
            .await;

        assert_eq!(verdict, DispatchVerdict::Processed);
        assert_eq!(mike_seen.lock().unwrap().len(), 1);
        assert!(mary_seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn both_legs_local_notifies_both_plugins() {
        let (factory, _ledger, _channel) = setup();
        factory.connect().await.unwrap();
        let mike = factory.create(CreateOptions { username: "mike".into() }).await.unwrap();
        let mary = factory.create(CreateOptions { username: "mary".into() }).await.unwrap();

        let (mike_events, mike_seen) = collector();
        mike.subscribe(EventName::OutgoingTransfer, mike_events);
        let (mary_events, mary_seen) = collector();
        mary.subscribe(EventName::IncomingTransfer, mary_events);

        let verdict = factory.dispatch(&transfer_notification(MIKE, MARY)).await;

        assert_eq!(verdict, DispatchVerdict::Processed);
        let mike_seen = mike_seen.lock().unwrap();
        match &mike_seen[0] {
            PluginEvent::Execute(t) => assert_eq!(t.direction, Direction::Outgoing),
            other => panic!("expected execute event, got {other:?}"),
        }
        assert_eq!(mary_seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unrelated_notifications_are_ignored() {
        let (factory, _ledger, _channel) = setup();
        factory.connect().await.unwrap();
        factory.create(CreateOptions { username: "mike".into() }).await.unwrap();

        let verdict = factory
            .dispatch(&transfer_notification(
                "http://red.example/accounts/alice",
                "http://red.example/accounts/bob",
            ))
            .await;
        assert_eq!(verdict, DispatchVerdict::Ignored(IgnoreReason::unrelated()));
    }

    #[tokio::test]
    async fn messages_route_to_the_addressed_plugin() {
        let (factory, _ledger, _channel) = setup();
        factory.connect().await.unwrap();
        let mike = factory.create(CreateOptions { username: "mike".into() }).await.unwrap();

        let (events, seen) = collector();
        mike.subscribe(EventName::IncomingMessage, events);

        let doc = serde_json::from_value(json!({
            "ledger": BASE,
            "from": "http://red.example/accounts/alice",
            "to": MIKE,
            "data": {}
        }))
        .unwrap();
        let verdict = factory.dispatch(&Notification::MessageSend { message: doc }).await;

        assert_eq!(verdict, DispatchVerdict::Processed);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn serialized_creates_never_interleave_subscriptions() {
        // Two concurrent creates; the lock inside create() forces the
        // account list of the second subscribe to contain the first.
        let (factory, _ledger, channel) = setup();
        factory.connect().await.unwrap();

        let f1 = factory.clone();
        let f2 = factory.clone();
        let (a, b) = tokio::join!(
            f1.create(CreateOptions { username: "mike".into() }),
            f2.create(CreateOptions { username: "mary".into() }),
        );
        a.unwrap();
        b.unwrap();

        let subs = channel.subscriptions();
        assert_eq!(subs.len(), 3);
        let last = subs.last().unwrap();
        assert_eq!(last.params.accounts.len(), 3);
        assert_eq!(last.params.accounts[0], ADMIN);
        assert!(subs[1].params.accounts.len() < last.params.accounts.len());
    }

    #[test]
    fn username_validation() {
        assert!(valid_username("mike"));
        assert!(valid_username("mary.smith_01~x-"));
        assert!(!valid_username("foo!"));
        assert!(!valid_username("a"));
        assert!(!valid_username(""));
    }
}
