//! WebSocket Transport
//!
//! The production transport: one logical WebSocket link to the backend,
//! kept alive by a supervisor task that reconnects automatically with
//! bounded exponential backoff. Retries continue indefinitely; only
//! [`ChatTransport::shutdown`] stops them.
//!
//! # Design Philosophy
//!
//! The supervisor owns the socket exclusively. The rest of the crate talks
//! to it through channels: outbound frames go in, [`TransportEvent`]s come
//! out. Transport drops are reported as `Down` and recovered silently —
//! they never become conversation entries. Backend-reported errors travel
//! as ordinary `Frame` events and are the normalizer's business.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::ReconnectPolicy;

use super::traits::{ChatTransport, TransportError, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reconnecting WebSocket transport
pub struct WebSocketTransport {
    /// Backend WebSocket endpoint
    url: String,
    /// Backoff policy handed to the supervisor
    policy: ReconnectPolicy,
    /// Handshake timeout per attempt
    connect_timeout: Duration,
    /// Outbound frames into the supervisor
    outbound_tx: mpsc::Sender<String>,
    /// Taken by the supervisor on connect
    outbound_rx: Option<mpsc::Receiver<String>>,
    /// Link events out of the supervisor
    event_rx: mpsc::Receiver<TransportEvent>,
    /// Kept to hand a clone to the supervisor
    event_tx: mpsc::Sender<TransportEvent>,
    /// Whether the link is currently open
    open: Arc<AtomicBool>,
    /// Set once by shutdown; never cleared
    shut_down: Arc<AtomicBool>,
    /// Wakes the supervisor out of connects, pumps, and backoff sleeps
    notify: Arc<Notify>,
    /// The supervisor task, present after connect
    task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Create a transport for the given endpoint.
    ///
    /// Nothing happens until [`ChatTransport::connect`] is called.
    #[must_use]
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy, connect_timeout: Duration) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);

        Self {
            url: url.into(),
            policy,
            connect_timeout,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            event_rx,
            event_tx,
            open: Arc::new(AtomicBool::new(false)),
            shut_down: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            task: None,
        }
    }

    /// The endpoint this transport targets
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatTransport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.task.is_some() {
            // Supervisor already running (connecting or open).
            return Ok(());
        }

        let Some(outbound_rx) = self.outbound_rx.take() else {
            return Err(TransportError::InvalidState(
                "supervisor already consumed".to_string(),
            ));
        };

        let supervisor = Supervisor {
            url: self.url.clone(),
            policy: self.policy.clone(),
            connect_timeout: self.connect_timeout,
            outbound_rx,
            event_tx: self.event_tx.clone(),
            open: Arc::clone(&self.open),
            shut_down: Arc::clone(&self.shut_down),
            notify: Arc::clone(&self.notify),
        };
        self.task = Some(tokio::spawn(supervisor.run()));
        Ok(())
    }

    async fn send(&self, frame: String) -> Result<(), TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.outbound_tx
            .send(frame)
            .await
            .map_err(|_| TransportError::SendFailed("supervisor gone".to_string()))
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.shut_down.load(Ordering::SeqCst) {
            return None;
        }
        self.event_rx.recv().await
    }

    fn try_next_event(&mut self) -> Option<TransportEvent> {
        if self.shut_down.load(Ordering::SeqCst) {
            return None;
        }
        self.event_rx.try_recv().ok()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn shutdown(&mut self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.open.store(false, Ordering::SeqCst);
        self.notify.notify_one();
        self.event_rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::info!("WebSocket transport shut down");
    }
}

/// The background task that owns the socket
struct Supervisor {
    url: String,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    outbound_rx: mpsc::Receiver<String>,
    event_tx: mpsc::Sender<TransportEvent>,
    open: Arc<AtomicBool>,
    shut_down: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

/// Why the pump loop ended
enum PumpEnd {
    /// Transport drop or read/write failure: reconnect
    LinkLost,
    /// Shutdown requested: stop for good
    Disposed,
}

impl Supervisor {
    async fn run(mut self) {
        let mut delay = self.policy.initial_delay();

        loop {
            if self.shut_down.load(Ordering::SeqCst) {
                break;
            }

            tracing::debug!(url = %self.url, "Opening WebSocket");
            let attempt = tokio::time::timeout(self.connect_timeout, connect_async(&self.url));
            let stream = tokio::select! {
                _ = self.notify.notified() => break,
                result = attempt => match result {
                    Ok(Ok((stream, _response))) => stream,
                    Ok(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket connect failed");
                        if self.backoff(&mut delay).await {
                            continue;
                        }
                        break;
                    }
                    Err(_) => {
                        tracing::debug!("WebSocket connect timed out");
                        if self.backoff(&mut delay).await {
                            continue;
                        }
                        break;
                    }
                },
            };

            self.open.store(true, Ordering::SeqCst);
            if self.event_tx.send(TransportEvent::Up).await.is_err() {
                break;
            }
            tracing::info!(url = %self.url, "WebSocket connected");
            delay = self.policy.initial_delay();

            let (mut sink, mut reader) = stream.split();
            let end = self.pump(&mut sink, &mut reader).await;
            self.open.store(false, Ordering::SeqCst);

            match end {
                PumpEnd::Disposed => {
                    let _ = sink.close().await;
                    break;
                }
                PumpEnd::LinkLost => {
                    if self.event_tx.send(TransportEvent::Down).await.is_err() {
                        break;
                    }
                    tracing::warn!(url = %self.url, "WebSocket link lost, reconnecting");
                    if !self.backoff(&mut delay).await {
                        break;
                    }
                }
            }
        }

        self.open.store(false, Ordering::SeqCst);
        tracing::debug!("WebSocket supervisor stopped");
    }

    /// Shuttle frames both ways until the link drops or shutdown arrives
    async fn pump(
        &mut self,
        sink: &mut SplitSink<WsStream, WsMessage>,
        reader: &mut SplitStream<WsStream>,
    ) -> PumpEnd {
        loop {
            tokio::select! {
                _ = self.notify.notified() => return PumpEnd::Disposed,

                maybe = self.outbound_rx.recv() => match maybe {
                    Some(frame) => {
                        if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                            tracing::warn!(error = %e, "WebSocket write failed");
                            return PumpEnd::LinkLost;
                        }
                    }
                    // All senders dropped: the transport handle is gone.
                    None => return PumpEnd::Disposed,
                },

                inbound = reader.next() => match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        if self.event_tx.send(TransportEvent::Frame(text)).await.is_err() {
                            return PumpEnd::Disposed;
                        }
                    }
                    // tungstenite answers pings on flush; nothing to do.
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                    Some(Ok(WsMessage::Binary(_))) => {
                        tracing::debug!("Ignoring binary frame");
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return PumpEnd::LinkLost,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WebSocket read error");
                        return PumpEnd::LinkLost;
                    }
                },
            }
        }
    }

    /// Sleep out the backoff delay. Returns false when shutdown interrupts.
    async fn backoff(&self, delay: &mut Duration) -> bool {
        if self.shut_down.load(Ordering::SeqCst) {
            return false;
        }
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
        tokio::select! {
            _ = self.notify.notified() => false,
            () = tokio::time::sleep(*delay) => {
                *delay = self.policy.next_delay(*delay);
                true
            }
        }
    }
}
