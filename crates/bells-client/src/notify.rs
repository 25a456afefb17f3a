//! The ledger notification channel.
//!
//! One WebSocket connection per channel, authenticated by a bearer token
//! passed as a `?token=` query parameter. Outbound `subscribe_account`
//! requests carry a monotonically increasing JSON-RPC id starting at 1.
//! Inbound frames are processed strictly one at a time in arrival order:
//! read, dispatch, reply. A slow dispatch delays the next frame; nothing is
//! reordered or dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

use bells_protocol::{DispatchVerdict, InboundMessage, Notification, RpcReply, SubscribeRequest};
use bells_types::{PluginError, PluginResult};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Receives decoded notifications and renders a verdict for the RPC reply.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> DispatchVerdict;
}

/// The subscription surface of a notification channel.
///
/// Abstracted as a trait so plugin and factory logic can be exercised
/// against a recording implementation without a live socket.
#[async_trait]
pub trait SubscriptionChannel: Send + Sync {
    /// Open the channel. Calling `connect` while connected is a no-op
    /// returning success.
    async fn connect(
        &self,
        ws_url: &str,
        token: &str,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> PluginResult<()>;

    async fn disconnect(&self);

    /// Reflects actual socket state.
    fn is_connected(&self) -> bool;

    /// Replace the subscribed account set with `accounts`, in order.
    async fn subscribe(&self, accounts: Vec<String>) -> PluginResult<()>;
}

/// Monotonically increasing JSON-RPC request id, starting at 1, for the
/// lifetime of the channel.
#[derive(Debug)]
pub struct RpcIdSequence(AtomicU64);

impl RpcIdSequence {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for RpcIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle one inbound text frame.
///
/// `None` means the frame was unrecognizable (invalid JSON, or no
/// `type`/`method`) and gets no reply. Everything else maps to a
/// `processed`/`ignored` reply body.
pub async fn handle_frame(text: &str, dispatcher: &dyn NotificationDispatcher) -> Option<RpcReply> {
    match InboundMessage::parse(text)? {
        InboundMessage::Connect => Some(RpcReply::processed()),
        InboundMessage::Notify(params) => Some(match Notification::decode(params) {
            Ok(notification) => dispatcher.dispatch(&notification).await.into_reply(),
            Err(reason) => RpcReply::ignored(reason),
        }),
    }
}

struct ChannelInner {
    sink: Arc<Mutex<WsSink>>,
    reader: JoinHandle<()>,
}

/// `tokio-tungstenite`-backed [`SubscriptionChannel`].
pub struct WsNotificationChannel {
    ids: RpcIdSequence,
    connected: Arc<AtomicBool>,
    inner: Mutex<Option<ChannelInner>>,
}

impl WsNotificationChannel {
    pub fn new() -> Self {
        Self {
            ids: RpcIdSequence::new(),
            connected: Arc::new(AtomicBool::new(false)),
            inner: Mutex::new(None),
        }
    }
}

impl Default for WsNotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionChannel for WsNotificationChannel {
    async fn connect(
        &self,
        ws_url: &str,
        token: &str,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> PluginResult<()> {
        let mut guard = self.inner.lock().await;
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(stale) = guard.take() {
            stale.reader.abort();
        }

        let mut url = Url::parse(ws_url)
            .map_err(|e| PluginError::Transport(format!("invalid websocket url: {e}")))?;
        url.query_pairs_mut().append_pair("token", token);

        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| PluginError::Transport(e.to_string()))?;
        debug!(url = ws_url, "notification channel connected");

        let (sink, source) = stream.split();
        let sink = Arc::new(Mutex::new(sink));
        self.connected.store(true, Ordering::SeqCst);
        let reader = tokio::spawn(read_loop(
            source,
            sink.clone(),
            dispatcher,
            self.connected.clone(),
        ));
        *guard = Some(ChannelInner { sink, reader });
        Ok(())
    }

    async fn disconnect(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(inner) = guard.take() {
            inner.reader.abort();
            let _ = inner.sink.lock().await.close().await;
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn subscribe(&self, accounts: Vec<String>) -> PluginResult<()> {
        let guard = self.inner.lock().await;
        let inner = guard
            .as_ref()
            .filter(|_| self.connected.load(Ordering::SeqCst))
            .ok_or_else(|| PluginError::not_connected("subscribe"))?;

        let request = SubscribeRequest::new(self.ids.next(), accounts);
        debug!(
            id = request.id,
            accounts = request.params.accounts.len(),
            "updating account subscriptions"
        );
        let result = inner
            .sink
            .lock()
            .await
            .send(WsMessage::Text(request.to_json()))
            .await
            .map_err(|e| PluginError::Transport(e.to_string()));
        result
    }
}

/// Sequential read → dispatch → reply loop. Runs until the socket closes.
async fn read_loop(
    mut source: WsSource,
    sink: Arc<Mutex<WsSink>>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    connected: Arc<AtomicBool>,
) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => {
                if let Some(reply) = handle_frame(&text, dispatcher.as_ref()).await {
                    let mut sink = sink.lock().await;
                    if let Err(err) = sink.send(WsMessage::Text(reply.to_json())).await {
                        warn!(error = %err, "failed to send notification reply");
                        break;
                    }
                }
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "notification channel read error");
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
    debug!("notification channel closed");
}
