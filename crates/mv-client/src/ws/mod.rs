//! WebSocket event channel.
//!
//! One logical connection carries every server-push channel the
//! application cares about. The connection manager owns the transport
//! lifecycle — connect, heartbeat, reconnect with exponential backoff,
//! intentional disconnect — and replays the intended subscription set on
//! every successful open so the server-visible state always converges to
//! what the application asked for.

mod backoff;
mod dispatch;
mod subscriptions;

pub use backoff::{base_delay, reconnect_delay, MAX_RECONNECT_ATTEMPTS};
pub use dispatch::{ListenerGuard, MessageBus, MessageHandler};
pub use subscriptions::SubscriptionSet;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsFrame;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use mv_protocol::ws::{rag_channel, task_channel, MessageType, WsMessage};
use mv_protocol::{HEARTBEAT_INTERVAL_SECS, NORMAL_CLOSE_CODE};

use crate::auth::TokenStore;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of the single event-channel connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

pub type StateHandler = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Connection parameters; everything else comes from the token store.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Event channel endpoint, e.g. `ws://host:8000/api/v1/ws`.
    pub url: String,
    pub ping_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl WsConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ping_interval: Duration::from_secs(HEARTBEAT_INTERVAL_SECS),
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }

    pub fn from_config(config: &mv_common::AppConfig) -> Self {
        Self::new(config.ws_url())
    }
}

/// Handle to the shared event-channel client. Cheap to clone; all clones
/// drive the same connection, subscription set, and listener registry.
#[derive(Clone)]
pub struct WsClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: WsConfig,
    tokens: TokenStore,
    state: Mutex<ConnectionState>,
    state_listeners: Mutex<Vec<(u64, StateHandler)>>,
    next_listener_id: AtomicU64,
    bus: MessageBus,
    subs: SubscriptionSet,
    /// Sender feeding the live session's write half, tagged with the
    /// session sequence so a stale session can't clear its successor.
    outbound: Mutex<Option<(u64, mpsc::UnboundedSender<WsFrame>)>>,
    next_session: AtomicU64,
    /// Bumped by `disconnect()`; a running connection task that observes a
    /// newer generation stops without touching shared state.
    generation: AtomicU64,
}

impl WsClient {
    pub fn new(config: WsConfig, tokens: TokenStore) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                tokens,
                state: Mutex::new(ConnectionState::Disconnected),
                state_listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
                bus: MessageBus::new(),
                subs: SubscriptionSet::new(),
                outbound: Mutex::new(None),
                next_session: AtomicU64::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────

    /// Open the event channel. No-op while a connection or attempt is in
    /// flight, and a logged no-op when no access token is available.
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        // The Disconnected -> Connecting transition happens under one lock
        // acquisition so concurrent connect() calls race for exactly one
        // connection task.
        {
            let mut state = self.inner.state.lock().unwrap();
            if *state != ConnectionState::Disconnected {
                return;
            }
            if self.inner.tokens.access_token().is_none() {
                tracing::warn!("event channel: no access token available, not connecting");
                return;
            }
            *state = ConnectionState::Connecting;
        }
        self.inner.notify_state(ConnectionState::Connecting);

        let generation = self.inner.generation.load(Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(run_client(inner, generation));
    }

    /// Close the event channel intentionally: cancels any pending
    /// reconnect, stops the heartbeat with the session, sends a normal
    /// close, and clears the intended subscription set.
    pub fn disconnect(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some((_, tx)) = self.inner.outbound.lock().unwrap().take() {
            let _ = tx.send(WsFrame::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "client disconnect".into(),
            })));
        }
        self.inner.subs.clear();
        self.inner.set_state(ConnectionState::Disconnected);
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock().unwrap()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Observe connection state changes. The handler fires immediately
    /// with the current state, then synchronously on every transition.
    pub fn on_state_change(
        &self,
        handler: impl Fn(ConnectionState) + Send + Sync + 'static,
    ) -> StateListenerGuard {
        let handler: StateHandler = Arc::new(handler);
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .state_listeners
            .lock()
            .unwrap()
            .push((id, Arc::clone(&handler)));
        handler(self.state());
        StateListenerGuard {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    // ─── Messaging ───────────────────────────────────────────

    /// Register a handler for one message type.
    pub fn on(
        &self,
        kind: MessageType,
        handler: impl Fn(&WsMessage) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> ListenerGuard {
        self.inner.bus.on(kind, handler)
    }

    /// Register a wildcard handler for every forwarded message.
    pub fn on_any(
        &self,
        handler: impl Fn(&WsMessage) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> ListenerGuard {
        self.inner.bus.on_any(handler)
    }

    /// Send a frame. Safe no-op (logged) while not connected.
    pub fn send(&self, message: &WsMessage) {
        let guard = self.inner.outbound.lock().unwrap();
        let Some((_, tx)) = guard.as_ref() else {
            tracing::warn!(kind = ?message.kind, "event channel: not connected, dropping outbound frame");
            return;
        };
        match serde_json::to_string(message) {
            Ok(text) => {
                let _ = tx.send(WsFrame::Text(text));
            }
            Err(e) => tracing::error!(error = %e, "event channel: failed to encode frame"),
        }
    }

    // ─── Subscriptions ───────────────────────────────────────

    /// Add a channel to the intended set; sends a `subscribe` frame right
    /// away when connected.
    pub fn subscribe(&self, channel: &str) {
        self.inner.subs.add(channel);
        if self.is_connected() {
            self.send(&WsMessage::subscribe(channel));
        }
    }

    /// Remove a channel from the intended set; sends an `unsubscribe`
    /// frame right away when connected.
    pub fn unsubscribe(&self, channel: &str) {
        self.inner.subs.remove(channel);
        if self.is_connected() {
            self.send(&WsMessage::unsubscribe(channel));
        }
    }

    /// Subscribe to a task's lifecycle channel; unsubscribes on drop.
    pub fn subscribe_to_task(&self, task_id: &str) -> ChannelGuard {
        self.subscribe_guarded(task_channel(task_id))
    }

    /// Subscribe to a RAG session's channel; unsubscribes on drop.
    pub fn subscribe_to_rag_session(&self, session_id: &str) -> ChannelGuard {
        self.subscribe_guarded(rag_channel(session_id))
    }

    fn subscribe_guarded(&self, channel: String) -> ChannelGuard {
        self.subscribe(&channel);
        ChannelGuard {
            client: self.clone(),
            channel,
        }
    }

    /// Channels the client currently intends to be subscribed to.
    pub fn subscribed_channels(&self) -> Vec<String> {
        self.inner.subs.snapshot()
    }

    #[cfg(test)]
    pub(crate) fn emit(&self, message: &WsMessage) {
        self.inner.bus.emit(message);
    }
}

impl ClientInner {
    fn set_state(&self, next: ConnectionState) {
        {
            let mut state = self.state.lock().unwrap();
            if *state == next {
                return;
            }
            *state = next;
        }
        self.notify_state(next);
    }

    fn notify_state(&self, next: ConnectionState) {
        tracing::debug!(state = ?next, "event channel: state changed");
        let handlers: Vec<StateHandler> = self
            .state_listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(next);
        }
    }

    fn install_outbound(&self, session: u64, tx: mpsc::UnboundedSender<WsFrame>) {
        *self.outbound.lock().unwrap() = Some((session, tx));
    }

    fn clear_outbound(&self, session: u64) {
        let mut guard = self.outbound.lock().unwrap();
        if matches!(*guard, Some((current, _)) if current == session) {
            *guard = None;
        }
    }

    fn handle_frame(&self, text: &str) {
        let message: WsMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "event channel: dropping malformed frame");
                return;
            }
        };
        // Heartbeat replies stay internal to the transport layer
        if message.kind == MessageType::Pong {
            return;
        }
        tracing::debug!(kind = ?message.kind, channel = ?message.channel, "event channel: frame received");
        self.bus.emit(&message);
    }

    fn connect_url(&self) -> anyhow::Result<String> {
        let token = self
            .tokens
            .access_token()
            .ok_or_else(|| anyhow::anyhow!("no access token"))?;
        let mut url = url::Url::parse(&self.config.url)?;
        url.query_pairs_mut().append_pair("token", &token);
        Ok(url.into())
    }
}

/// Capability to remove one connection-state listener; removal on drop.
pub struct StateListenerGuard {
    inner: Arc<ClientInner>,
    id: u64,
}

impl Drop for StateListenerGuard {
    fn drop(&mut self) {
        self.inner
            .state_listeners
            .lock()
            .unwrap()
            .retain(|(id, _)| *id != self.id);
    }
}

/// Scoped channel subscription; drops intent (and notifies the server when
/// connected) when it goes out of scope.
pub struct ChannelGuard {
    client: WsClient,
    channel: String,
}

impl ChannelGuard {
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.client.unsubscribe(&self.channel);
    }
}

// ─── Connection task ─────────────────────────────────────────

enum SessionEnd {
    /// Server closed with the normal-closure code; do not reconnect.
    Normal,
    /// Anything else: abnormal close, transport error, stream end.
    Abnormal(String),
}

async fn run_client(inner: Arc<ClientInner>, generation: u64) {
    let mut attempt: u32 = 0;

    loop {
        if inner.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        // Each attempt, including retries after backoff, goes through
        // Connecting. Deduped to a no-op on the very first pass.
        inner.set_state(ConnectionState::Connecting);

        let url = match inner.connect_url() {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "event channel: cannot build connect URL, giving up");
                inner.set_state(ConnectionState::Disconnected);
                return;
            }
        };

        match connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                // disconnect() may have landed while the handshake was in
                // flight; a stale attempt must not start a session.
                if inner.generation.load(Ordering::SeqCst) != generation {
                    drop(stream);
                    return;
                }
                attempt = 0;
                tracing::info!("event channel: connected");
                let end = run_session(&inner, stream, generation).await;
                if inner.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                match end {
                    SessionEnd::Normal => {
                        tracing::info!("event channel: closed by server (normal)");
                        inner.set_state(ConnectionState::Disconnected);
                        return;
                    }
                    SessionEnd::Abnormal(reason) => {
                        tracing::warn!(%reason, "event channel: connection lost");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "event channel: connect failed");
            }
        }

        attempt += 1;
        if attempt > inner.config.max_reconnect_attempts {
            tracing::warn!(
                max = inner.config.max_reconnect_attempts,
                "event channel: max reconnect attempts reached, giving up"
            );
            inner.set_state(ConnectionState::Disconnected);
            return;
        }
        inner.set_state(ConnectionState::Reconnecting);
        let delay = reconnect_delay(attempt);
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "event channel: reconnecting");
        tokio::time::sleep(delay).await;
    }
}

async fn run_session(inner: &Arc<ClientInner>, stream: WsStream, generation: u64) -> SessionEnd {
    let (mut sink, mut source) = stream.split();
    let session = inner.next_session.fetch_add(1, Ordering::Relaxed);
    let (tx, mut rx) = mpsc::unbounded_channel::<WsFrame>();
    inner.install_outbound(session, tx);

    // Snapshot before announcing the state change so a subscribe issued
    // from a state listener queues behind the replay instead of doubling it.
    let replay = inner.subs.snapshot();
    inner.set_state(ConnectionState::Connected);

    for channel in replay {
        let frame = WsMessage::subscribe(&channel);
        match serde_json::to_string(&frame) {
            Ok(text) => {
                if sink.send(WsFrame::Text(text)).await.is_err() {
                    inner.clear_outbound(session);
                    return SessionEnd::Abnormal("write failed during subscription replay".into());
                }
                tracing::debug!(%channel, "event channel: subscription replayed");
            }
            Err(e) => tracing::error!(error = %e, "event channel: failed to encode subscribe frame"),
        }
    }

    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + inner.config.ping_interval,
        inner.config.ping_interval,
    );

    let end = loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let frame = WsMessage::ping();
                let text = serde_json::to_string(&frame).unwrap_or_default();
                if sink.send(WsFrame::Text(text)).await.is_err() {
                    break SessionEnd::Abnormal("heartbeat write failed".into());
                }
            }
            Some(frame) = rx.recv() => {
                if sink.send(frame).await.is_err() {
                    break SessionEnd::Abnormal("write error".into());
                }
            }
            incoming = source.next() => match incoming {
                Some(Ok(WsFrame::Text(text))) => inner.handle_frame(&text),
                Some(Ok(WsFrame::Ping(payload))) => {
                    let _ = sink.send(WsFrame::Pong(payload)).await;
                }
                Some(Ok(WsFrame::Close(frame))) => {
                    let normal = frame
                        .as_ref()
                        .map(|f| u16::from(f.code) == NORMAL_CLOSE_CODE)
                        .unwrap_or(false);
                    break if normal {
                        SessionEnd::Normal
                    } else {
                        let code = frame.map(|f| f.code.to_string()).unwrap_or_else(|| "none".into());
                        SessionEnd::Abnormal(format!("closed with code {code}"))
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break SessionEnd::Abnormal(e.to_string()),
                None => break SessionEnd::Abnormal("stream ended".into()),
            }
        }
    };

    inner.clear_outbound(session);
    end
}
