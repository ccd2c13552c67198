/*
[INPUT]:  StreamConfig, topic subscriptions with async callbacks, optional on-connected hook
[OUTPUT]: Routed `data` payloads delivered to per-topic callbacks across reconnects
[POS]:    WebSocket layer - session state machine, receive loop and router
[UPDATE]: When changing reconnect semantics, replay, or dispatch concurrency
*/

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::config::{ReconnectPolicy, StreamConfig};
use super::error::{Result, StreamError};
use super::message::{self, Command, SymbolsEncoding};
use super::registry::{Callback, Subscription, SubscriptionRegistry};
use super::transport::{Connector, Frame, Transport, WsConnector};

const RAW_LOG_MAX_BYTES: usize = 1024;

/// Invoked after every successful connect with a handle to the session.
pub type ConnectedHook = Arc<dyn Fn(StreamHandle) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// State shared between the worker and every handle.
struct Shared {
    registry: SubscriptionRegistry,
    /// `Some` exactly while connected. Held across registry mutation + enqueue
    /// so a command is either sent live or replayed, never both.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    state: watch::Sender<ConnectionState>,
    encoding: SymbolsEncoding,
    shutdown: CancellationToken,
}

/// Cloneable handle for managing subscriptions on a running session.
#[derive(Clone)]
pub struct StreamHandle {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("state", &self.state())
            .field("topics", &self.shared.registry.len())
            .finish()
    }
}

impl StreamHandle {
    /// Subscribe `topic` with no address or symbols.
    pub async fn subscribe(&self, topic: &str, callback: Callback) -> Result<()> {
        self.subscribe_with(topic, Subscription::new(callback)).await
    }

    /// Register `subscription` for `topic`, replacing any previous one.
    ///
    /// The command goes out immediately when connected, otherwise on the next
    /// connect. A send error leaves the subscription registered for replay.
    pub async fn subscribe_with(&self, topic: &str, subscription: Subscription) -> Result<()> {
        if self.shared.shutdown.is_cancelled() {
            return Err(StreamError::Shutdown);
        }

        let command = subscription.command(topic, self.shared.encoding);
        let outbound = self.shared.outbound.lock().await;
        self.shared.registry.put(topic, subscription);

        match outbound.as_ref() {
            Some(tx) => send_command(tx, &command),
            None => {
                debug!(%topic, "stream offline; subscribe deferred until connect");
                Ok(())
            }
        }
    }

    /// Remove `topic`. Unknown topics are a no-op and send nothing.
    pub async fn unsubscribe(&self, topic: &str) -> Result<()> {
        if self.shared.shutdown.is_cancelled() {
            return Err(StreamError::Shutdown);
        }

        let outbound = self.shared.outbound.lock().await;
        if self.shared.registry.remove(topic).is_none() {
            return Ok(());
        }

        match outbound.as_ref() {
            Some(tx) => send_command(tx, &Command::unsubscribe(topic)),
            None => Ok(()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Topics currently registered, in no particular order.
    pub fn topics(&self) -> Vec<String> {
        self.shared.registry.topics()
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.shared.registry.contains(topic)
    }
}

fn send_command(tx: &mpsc::UnboundedSender<String>, command: &Command) -> Result<()> {
    tx.send(command.to_json())
        .map_err(|_| StreamError::Send("connection dropped before the command was queued".into()))?;
    debug!(method = ?command.method, topic = %command.topic, "command queued");
    Ok(())
}

/// Builder for [`StreamSession`].
pub struct StreamSessionBuilder {
    config: StreamConfig,
    on_connected: Option<ConnectedHook>,
    connector: Arc<dyn Connector>,
}

impl StreamSessionBuilder {
    /// Run `hook` after every successful connect, once per connect.
    pub fn on_connected<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(StreamHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: ConnectedHook =
            Arc::new(move |handle: StreamHandle| -> BoxFuture<'static, ()> { Box::pin(hook(handle)) });
        self.on_connected = Some(hook);
        self
    }

    /// Replace the websocket connector, e.g. with an in-memory transport.
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Spawn the session worker. Must be called inside a Tokio runtime.
    pub fn start(self) -> Result<StreamSession> {
        let endpoint = self.config.stream_url()?;
        let proxy = self.config.proxy_url()?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(StreamError::Config(
                "stream session requires a Tokio runtime".to_string(),
            ));
        }

        let (state, _rx) = watch::channel(ConnectionState::Disconnected);
        let shared = Arc::new(Shared {
            registry: SubscriptionRegistry::new(),
            outbound: Mutex::new(None),
            state,
            encoding: self.config.symbols_encoding,
            shutdown: CancellationToken::new(),
        });

        let worker = SessionWorker {
            shared: shared.clone(),
            connector: self.connector,
            endpoint,
            proxy,
            connect_timeout: self.config.connect_timeout,
            reconnect: self.config.reconnect,
            on_connected: self.on_connected,
        };

        Ok(StreamSession {
            handle: StreamHandle { shared },
            worker: Some(tokio::spawn(worker.run())),
        })
    }
}

/// Long-lived streaming session over one multiplexed connection.
///
/// Connects on start, replays every registered subscription on each
/// (re)connect and keeps reconnecting until [`StreamSession::shutdown`].
/// Dropping the session also shuts it down.
pub struct StreamSession {
    handle: StreamHandle,
    worker: Option<JoinHandle<()>>,
}

impl StreamSession {
    pub fn builder(config: StreamConfig) -> StreamSessionBuilder {
        StreamSessionBuilder {
            config,
            on_connected: None,
            connector: Arc::new(WsConnector),
        }
    }

    /// Start a session with the default websocket connector and no hook.
    pub fn connect(config: StreamConfig) -> Result<Self> {
        Self::builder(config).start()
    }

    pub fn handle(&self) -> StreamHandle {
        self.handle.clone()
    }

    pub async fn subscribe(&self, topic: &str, callback: Callback) -> Result<()> {
        self.handle.subscribe(topic, callback).await
    }

    pub async fn subscribe_with(&self, topic: &str, subscription: Subscription) -> Result<()> {
        self.handle.subscribe_with(topic, subscription).await
    }

    pub async fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.handle.unsubscribe(topic).await
    }

    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.handle.watch_state()
    }

    /// Stop the receive loop, release the transport and wait for the worker.
    ///
    /// Callbacks already running are left to finish.
    pub async fn shutdown(mut self) {
        self.handle.shared.shutdown.cancel();
        if let Some(worker) = self.worker.take()
            && let Err(err) = worker.await
        {
            warn!(error = %err, "stream worker ended abnormally");
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.handle.shared.shutdown.cancel();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamExit {
    Disconnected,
    Shutdown,
}

enum LoopEvent {
    Shutdown,
    Outbound(Option<String>),
    Inbound(Frame),
}

struct SessionWorker {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    endpoint: Url,
    proxy: Option<Url>,
    connect_timeout: Duration,
    reconnect: ReconnectPolicy,
    on_connected: Option<ConnectedHook>,
}

impl SessionWorker {
    async fn run(self) {
        let mut retry_count: u32 = 0;

        'run: loop {
            if self.shared.shutdown.is_cancelled() {
                break 'run;
            }

            self.shared.state.send_replace(ConnectionState::Connecting);
            info!(endpoint = %self.endpoint, retry_count, "connecting stream");

            let connected = tokio::select! {
                _ = self.shared.shutdown.cancelled() => break 'run,
                result = self.connect_once() => result,
            };

            let backoff = match connected {
                Ok(transport) => {
                    let outbound_rx = self.go_live().await;
                    self.fire_hook();

                    let connected_at = Instant::now();
                    let exit = self.stream_loop(transport, outbound_rx).await;
                    self.go_offline().await;
                    if exit == StreamExit::Shutdown {
                        break 'run;
                    }
                    let uptime = connected_at.elapsed();
                    retry_count = self.reconnect.attempt_after_disconnect(retry_count, uptime);
                    let backoff = self.reconnect.delay_for_attempt(retry_count);
                    debug!(retry_count, ?uptime, ?backoff, "stream dropped; redialing after backoff");
                    backoff
                }
                Err(err) => {
                    retry_count = retry_count.saturating_add(1);
                    let backoff = self.reconnect.delay_for_attempt(retry_count);
                    warn!(retry_count, ?backoff, error = %err, "stream connect failed; retrying with backoff");
                    backoff
                }
            };

            tokio::select! {
                _ = self.shared.shutdown.cancelled() => break 'run,
                _ = tokio::time::sleep(backoff) => {}
            }
        }

        self.go_offline().await;
        self.shared.state.send_replace(ConnectionState::Disconnected);
        info!("stream session shut down");
    }

    async fn connect_once(&self) -> Result<Box<dyn Transport>> {
        let connect = self.connector.connect(&self.endpoint, self.proxy.as_ref());
        match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(result) => result,
            Err(_) => Err(StreamError::Connection(format!(
                "connect timed out after {:?}",
                self.connect_timeout
            ))),
        }
    }

    /// Install a fresh outbound channel, queue the replay of every registered
    /// subscription and publish `Connected`, all under the outbound lock.
    async fn go_live(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut outbound = self.shared.outbound.lock().await;

        let entries = self.shared.registry.all();
        for (topic, subscription) in &entries {
            let command = subscription.command(topic, self.shared.encoding);
            // rx is alive in this scope, so the send cannot fail.
            let _ = tx.send(command.to_json());
        }

        *outbound = Some(tx);
        self.shared.state.send_replace(ConnectionState::Connected);
        info!(replayed = entries.len(), "stream connected");
        rx
    }

    async fn go_offline(&self) {
        let mut outbound = self.shared.outbound.lock().await;
        *outbound = None;
        if !self.shared.shutdown.is_cancelled() {
            self.shared.state.send_replace(ConnectionState::Connecting);
        }
    }

    fn fire_hook(&self) {
        if let Some(hook) = &self.on_connected {
            let handle = StreamHandle {
                shared: self.shared.clone(),
            };
            tokio::spawn(hook(handle));
        }
    }

    async fn stream_loop(
        &self,
        mut transport: Box<dyn Transport>,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
    ) -> StreamExit {
        let exit = loop {
            let event = tokio::select! {
                biased;
                _ = self.shared.shutdown.cancelled() => LoopEvent::Shutdown,
                command = outbound_rx.recv() => LoopEvent::Outbound(command),
                frame = transport.recv() => LoopEvent::Inbound(frame),
            };

            match event {
                LoopEvent::Shutdown => {
                    debug!("stream shutdown requested");
                    break StreamExit::Shutdown;
                }
                LoopEvent::Outbound(Some(text)) => {
                    if let Err(err) = transport.send(text).await {
                        warn!(error = %err, "stream send failed");
                        break StreamExit::Disconnected;
                    }
                }
                LoopEvent::Outbound(None) => break StreamExit::Disconnected,
                LoopEvent::Inbound(Frame::Text(text)) => self.route_text(&text),
                LoopEvent::Inbound(Frame::Binary(bytes)) => {
                    debug!(bytes = bytes.len(), "binary frame received; not routed");
                }
                LoopEvent::Inbound(Frame::Closed) => {
                    info!("stream closed by remote");
                    break StreamExit::Disconnected;
                }
                LoopEvent::Inbound(Frame::Error(err)) => {
                    warn!(error = %err, "stream read failed");
                    break StreamExit::Disconnected;
                }
            }
        };

        transport.close().await;
        exit
    }

    /// Decode a text frame and hand its `data` to the topic's callback on a
    /// separate task, so a slow callback never stalls the receive loop.
    fn route_text(&self, text: &str) {
        let (inbound, decode_err) = message::decode(text);
        if let Some(err) = decode_err {
            debug!(
                error = %err,
                bytes = text.len(),
                message = %truncate_for_log(text, RAW_LOG_MAX_BYTES),
                "text frame is not JSON; routing raw payload"
            );
        }

        let Some(routed) = inbound.into_routed() else {
            debug!(bytes = text.len(), "frame carries no stream; dropped");
            return;
        };

        match self.shared.registry.callback(&routed.stream) {
            Some(callback) => {
                tokio::spawn(callback(routed.data));
            }
            None => {
                debug!(stream = %routed.stream, "no callback registered; dropped");
            }
        }
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::registry::callback;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);
    const QUIET: Duration = Duration::from_millis(100);

    /// Server side of one in-memory connection.
    struct MockRemote {
        sent: mpsc::UnboundedReceiver<String>,
        inbound: mpsc::UnboundedSender<Frame>,
    }

    impl MockRemote {
        async fn next_command(&mut self) -> Value {
            let text = timeout(WAIT, self.sent.recv())
                .await
                .expect("command within timeout")
                .expect("transport alive");
            serde_json::from_str(&text).expect("command is JSON")
        }

        /// Drain commands until the line has been quiet for a moment.
        async fn drain_commands(&mut self) -> Vec<Value> {
            let mut commands = Vec::new();
            while let Ok(Some(text)) = timeout(QUIET, self.sent.recv()).await {
                commands.push(serde_json::from_str(&text).expect("command is JSON"));
            }
            commands
        }

        fn push(&self, frame: Frame) {
            let _ = self.inbound.send(frame);
        }
    }

    struct MockTransport {
        sent: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<Frame>,
        closed: bool,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, text: String) -> Result<()> {
            if self.closed {
                return Err(StreamError::Send("closed".into()));
            }
            self.sent
                .send(text)
                .map_err(|_| StreamError::Send("remote gone".into()))
        }

        async fn recv(&mut self) -> Frame {
            if self.closed {
                return Frame::Closed;
            }
            match self.inbound.recv().await {
                Some(frame) => {
                    if frame.is_terminal() {
                        self.closed = true;
                    }
                    frame
                }
                None => {
                    self.closed = true;
                    Frame::Closed
                }
            }
        }

        async fn close(&mut self) {
            self.closed = true;
        }
    }

    #[derive(Clone)]
    struct MockConnector {
        attempts: Arc<AtomicUsize>,
        fail_first: usize,
        remotes: mpsc::UnboundedSender<MockRemote>,
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self, _endpoint: &Url, _proxy: Option<&Url>) -> Result<Box<dyn Transport>> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                return Err(StreamError::Connection("refused".into()));
            }
            let (sent_tx, sent_rx) = mpsc::unbounded_channel();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            let _ = self.remotes.send(MockRemote {
                sent: sent_rx,
                inbound: inbound_tx,
            });
            Ok(Box::new(MockTransport {
                sent: sent_tx,
                inbound: inbound_rx,
                closed: false,
            }))
        }
    }

    struct Harness {
        attempts: Arc<AtomicUsize>,
        remotes: mpsc::UnboundedReceiver<MockRemote>,
        builder: StreamSessionBuilder,
    }

    fn harness(fail_first: usize) -> Harness {
        let (remotes_tx, remotes) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        let config = StreamConfig::default().with_reconnect(ReconnectPolicy {
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            stable_after: Duration::from_secs(10),
        });
        let builder = StreamSession::builder(config).connector(MockConnector {
            attempts: attempts.clone(),
            fail_first,
            remotes: remotes_tx,
        });
        Harness {
            attempts,
            remotes,
            builder,
        }
    }

    async fn next_remote(remotes: &mut mpsc::UnboundedReceiver<MockRemote>) -> MockRemote {
        timeout(WAIT, remotes.recv())
            .await
            .expect("connect within timeout")
            .expect("connector alive")
    }

    async fn wait_for_state(handle: &StreamHandle, wanted: ConnectionState) {
        let mut rx = handle.watch_state();
        timeout(WAIT, rx.wait_for(|state| *state == wanted))
            .await
            .expect("state within timeout")
            .map(|_| ())
            .expect("state sender alive");
    }

    fn forwarding_callback(tx: mpsc::UnboundedSender<Value>) -> Callback {
        callback(move |data| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(data);
            }
        })
    }

    #[tokio::test]
    async fn kline_subscription_end_to_end() {
        let Harness {
            mut remotes,
            builder,
            ..
        } = harness(0);
        let session = builder.start().unwrap();
        let mut remote = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        session
            .subscribe("kline_1m", forwarding_callback(tx))
            .await
            .unwrap();

        let command = remote.next_command().await;
        assert_eq!(command, json!({"method": "subscribe", "topic": "kline_1m"}));

        remote.push(Frame::Text(
            r#"{"stream":"kline_1m","data":{"close":"1.23"}}"#.to_string(),
        ));

        let data = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(data, json!({"close": "1.23"}));
        assert!(timeout(QUIET, rx.recv()).await.is_err());

        session.shutdown().await;
    }

    #[tokio::test]
    async fn reconnect_replays_each_registered_topic_once() {
        let Harness {
            mut remotes,
            builder,
            ..
        } = harness(0);
        let session = builder.start().unwrap();
        let mut first = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;

        for topic in ["orders", "trades", "kline_1m"] {
            session
                .subscribe(topic, callback(|_| async {}))
                .await
                .unwrap();
        }
        // Resubscribing replaces the entry; it is not a fourth topic.
        session.subscribe("orders", callback(|_| async {})).await.unwrap();
        assert_eq!(first.drain_commands().await.len(), 4);

        first.push(Frame::Closed);
        let mut second = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;

        let replayed = second.drain_commands().await;
        let mut topics: Vec<&str> = replayed
            .iter()
            .map(|command| {
                assert_eq!(command["method"], "subscribe");
                command["topic"].as_str().unwrap()
            })
            .collect();
        topics.sort_unstable();
        assert_eq!(topics, vec!["kline_1m", "orders", "trades"]);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn subscribe_while_disconnected_is_sent_on_connect() {
        let Harness {
            attempts,
            mut remotes,
            builder,
        } = harness(3);
        let session = builder.start().unwrap();

        session
            .subscribe_with(
                "orders",
                Subscription::new(callback(|_| async {})).with_address("tbnb1owner"),
            )
            .await
            .unwrap();

        let mut remote = next_remote(&mut remotes).await;
        assert!(attempts.load(Ordering::SeqCst) >= 4);

        let commands = remote.drain_commands().await;
        assert_eq!(
            commands,
            vec![json!({"method": "subscribe", "topic": "orders", "address": "tbnb1owner"})]
        );

        session.shutdown().await;
    }

    #[tokio::test]
    async fn unsubscribe_sends_command_and_tolerates_absent_topics() {
        let Harness {
            mut remotes,
            builder,
            ..
        } = harness(0);
        let session = builder.start().unwrap();
        let mut remote = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;

        session.unsubscribe("ticker").await.unwrap();
        assert!(session.handle().topics().is_empty());

        session.subscribe("ticker", callback(|_| async {})).await.unwrap();
        session.unsubscribe("ticker").await.unwrap();

        let commands = remote.drain_commands().await;
        assert_eq!(
            commands,
            vec![
                json!({"method": "subscribe", "topic": "ticker"}),
                json!({"method": "unsubscribe", "topic": "ticker"}),
            ]
        );
        assert!(!session.handle().is_subscribed("ticker"));

        session.shutdown().await;
    }

    #[tokio::test]
    async fn routes_only_to_matching_topic() {
        let Harness {
            mut remotes,
            builder,
            ..
        } = harness(0);
        let session = builder.start().unwrap();
        let remote = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;

        let (orders_tx, mut orders_rx) = mpsc::unbounded_channel();
        let (trades_tx, mut trades_rx) = mpsc::unbounded_channel();
        session.subscribe("orders", forwarding_callback(orders_tx)).await.unwrap();
        session.subscribe("trades", forwarding_callback(trades_tx)).await.unwrap();

        remote.push(Frame::Text(r#"{"stream":"blockheight","data":{"h":1}}"#.into()));
        remote.push(Frame::Text(r#"{"stream":"trades","data":[{"p":"1"}]}"#.into()));

        let data = timeout(WAIT, trades_rx.recv()).await.unwrap().unwrap();
        assert_eq!(data, json!([{"p": "1"}]));
        assert!(timeout(QUIET, orders_rx.recv()).await.is_err());

        session.shutdown().await;
    }

    #[tokio::test]
    async fn stalled_callback_does_not_block_other_topics() {
        let Harness {
            mut remotes,
            builder,
            ..
        } = harness(0);
        let session = builder.start().unwrap();
        let remote = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;

        let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
        session
            .subscribe(
                "orders",
                callback(move |_| {
                    let entered_tx = entered_tx.clone();
                    async move {
                        let _ = entered_tx.send(());
                        std::future::pending::<()>().await;
                    }
                }),
            )
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        session.subscribe("trades", forwarding_callback(tx)).await.unwrap();

        remote.push(Frame::Text(r#"{"stream":"orders","data":1}"#.into()));
        timeout(WAIT, entered_rx.recv()).await.unwrap().unwrap();
        remote.push(Frame::Text(r#"{"stream":"trades","data":2}"#.into()));

        let data = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(data, json!(2));

        session.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_and_binary_frames_keep_loop_alive() {
        let Harness {
            mut remotes,
            builder,
            ..
        } = harness(0);
        let session = builder.start().unwrap();
        let remote = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        session.subscribe("accounts", forwarding_callback(tx)).await.unwrap();

        remote.push(Frame::Text("not json at all".into()));
        remote.push(Frame::Binary(vec![0xde, 0xad]));
        remote.push(Frame::Text(r#"{"data":"no stream"}"#.into()));
        remote.push(Frame::Text(r#"{"stream":"accounts","data":{"b":"10"}}"#.into()));

        let data = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(data, json!({"b": "10"}));
        assert!(timeout(QUIET, rx.recv()).await.is_err());
        assert_eq!(session.state(), ConnectionState::Connected);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn hook_runs_once_per_connect() {
        let Harness {
            mut remotes,
            builder,
            ..
        } = harness(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let (hook_tx, mut hook_rx) = mpsc::unbounded_channel();
        let hook_calls = calls.clone();
        let session = builder
            .on_connected(move |handle: StreamHandle| {
                let hook_calls = hook_calls.clone();
                let hook_tx = hook_tx.clone();
                async move {
                    hook_calls.fetch_add(1, Ordering::SeqCst);
                    let _ = hook_tx.send(handle.state());
                }
            })
            .start()
            .unwrap();

        let first = next_remote(&mut remotes).await;
        let state = timeout(WAIT, hook_rx.recv()).await.unwrap().unwrap();
        assert_eq!(state, ConnectionState::Connected);

        first.push(Frame::Error("reset by peer".into()));
        let _second = next_remote(&mut remotes).await;
        timeout(WAIT, hook_rx.recv()).await.unwrap().unwrap();

        assert!(timeout(QUIET, hook_rx.recv()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_is_terminal() {
        let Harness {
            attempts,
            mut remotes,
            builder,
        } = harness(0);
        let session = builder.start().unwrap();
        let handle = session.handle();
        let _remote = next_remote(&mut remotes).await;
        wait_for_state(&handle, ConnectionState::Connected).await;

        session.shutdown().await;

        assert_eq!(handle.state(), ConnectionState::Disconnected);
        assert_eq!(
            handle.subscribe("orders", callback(|_| async {})).await,
            Err(StreamError::Shutdown)
        );

        let attempts_after = attempts.load(Ordering::SeqCst);
        tokio::time::sleep(QUIET).await;
        assert_eq!(attempts.load(Ordering::SeqCst), attempts_after);
    }

    /// Run `op` after the receive loop has dropped its connection but before
    /// the worker has taken the session offline.
    async fn during_teardown<F, Fut>(session: &StreamSession, mut remote: MockRemote, op: F) -> Result<()>
    where
        F: FnOnce(StreamHandle) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let outbound = session.handle.shared.outbound.lock().await;
        // Queued on the outbound lock ahead of the worker's go_offline.
        let pending = tokio::spawn(op(session.handle()));
        tokio::time::sleep(QUIET).await;

        remote.push(Frame::Closed);
        // The transport is dropped once the receive loop has returned.
        while timeout(WAIT, remote.sent.recv())
            .await
            .expect("receive loop exits")
            .is_some()
        {}

        drop(outbound);
        pending.await.expect("operation task")
    }

    #[tokio::test]
    async fn subscribe_send_error_keeps_topic_for_replay() {
        let Harness {
            mut remotes,
            builder,
            ..
        } = harness(0);
        let session = builder.start().unwrap();
        let first = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;

        let result = during_teardown(&session, first, |handle| async move {
            handle.subscribe("orders", callback(|_| async {})).await
        })
        .await;
        assert!(matches!(result, Err(StreamError::Send(_))));
        assert!(session.handle().is_subscribed("orders"));

        let mut second = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;
        assert_eq!(
            second.drain_commands().await,
            vec![json!({"method": "subscribe", "topic": "orders"})]
        );

        session.shutdown().await;
    }

    #[tokio::test]
    async fn unsubscribe_send_error_still_removes_topic() {
        let Harness {
            mut remotes,
            builder,
            ..
        } = harness(0);
        let session = builder.start().unwrap();
        let mut first = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;

        session.subscribe("trades", callback(|_| async {})).await.unwrap();
        assert_eq!(first.next_command().await["topic"], "trades");

        let result = during_teardown(&session, first, |handle| async move {
            handle.unsubscribe("trades").await
        })
        .await;
        assert!(matches!(result, Err(StreamError::Send(_))));
        assert!(!session.handle().is_subscribed("trades"));

        let mut second = next_remote(&mut remotes).await;
        wait_for_state(&session.handle(), ConnectionState::Connected).await;
        assert!(second.drain_commands().await.is_empty());

        session.shutdown().await;
    }

    #[tokio::test]
    async fn start_rejects_unsupported_proxy_scheme() {
        let config = StreamConfig::default()
            .with_endpoint("ws://127.0.0.1:9")
            .with_proxy("socks5://127.0.0.1:1080");

        let err = StreamSession::connect(config).err().expect("config error");
        assert!(matches!(err, StreamError::Config(message) if message.contains("proxy scheme")));
    }

    #[test]
    fn truncate_for_log_respects_char_boundaries() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("ééé", 3), "é...");
    }
}
