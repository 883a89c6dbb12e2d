//! In-Process Transport
//!
//! Direct channel-based transport for tests and embedded use. The far end
//! of the pair plays the backend: it receives the frames the client sends
//! and injects [`TransportEvent`]s (frames, link drops) back.
//!
//! # Usage
//!
//! ```ignore
//! let (mut transport, mut sent_rx, inject_tx) = InProcessTransport::new_pair();
//! transport.connect().await?;
//!
//! // Backend side: read what the client sent, reply with a frame.
//! let outbound = sent_rx.recv().await.unwrap();
//! inject_tx.send(TransportEvent::Frame("{...}".into())).await.unwrap();
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::traits::{ChatTransport, TransportError, TransportEvent};

/// Channel-backed transport with a scriptable far end
pub struct InProcessTransport {
    /// Outbound frames, delivered to the far end
    frame_tx: mpsc::Sender<String>,
    /// Events injected by the far end
    event_rx: mpsc::Receiver<TransportEvent>,
    /// Locally synthesized events (the `Up` from `connect`)
    queued: VecDeque<TransportEvent>,
    /// Whether the simulated link is open
    open: bool,
    /// Whether the transport was shut down
    shut_down: bool,
}

impl InProcessTransport {
    /// Create a transport and its far end.
    ///
    /// Returns:
    /// - `InProcessTransport`: hand this to the engine
    /// - `mpsc::Receiver<String>`: frames the client sends arrive here
    /// - `mpsc::Sender<TransportEvent>`: inject inbound frames or link
    ///   drops from the test
    #[must_use]
    pub fn new_pair() -> (
        Self,
        mpsc::Receiver<String>,
        mpsc::Sender<TransportEvent>,
    ) {
        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);

        let transport = Self {
            frame_tx,
            event_rx,
            queued: VecDeque::new(),
            open: false,
            shut_down: false,
        };

        (transport, frame_rx, event_tx)
    }

    fn track(&mut self, event: &TransportEvent) {
        match event {
            TransportEvent::Up => self.open = true,
            TransportEvent::Down => self.open = false,
            TransportEvent::Frame(_) => {}
        }
    }
}

#[async_trait]
impl ChatTransport for InProcessTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.shut_down {
            return Err(TransportError::Closed);
        }
        if !self.open {
            self.open = true;
            self.queued.push_back(TransportEvent::Up);
        }
        Ok(())
    }

    async fn send(&self, frame: String) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }
        self.frame_tx
            .send(frame)
            .await
            .map_err(|_| TransportError::SendFailed("channel closed".to_string()))
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.queued.pop_front() {
            return Some(event);
        }
        if self.shut_down {
            return None;
        }
        let event = self.event_rx.recv().await?;
        self.track(&event);
        Some(event)
    }

    fn try_next_event(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.queued.pop_front() {
            return Some(event);
        }
        if self.shut_down {
            return None;
        }
        let event = self.event_rx.try_recv().ok()?;
        self.track(&event);
        Some(event)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn shutdown(&mut self) {
        self.open = false;
        self.shut_down = true;
        self.queued.clear();
        self.event_rx.close();
    }
}
