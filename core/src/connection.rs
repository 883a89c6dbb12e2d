//! Connection Manager
//!
//! Owns the transport and the session's connection lifecycle. This is the
//! only writer of [`ConnectionState`]; everything else observes it through
//! snapshots or [`ConnectionEvent`]s.
//!
//! # Lifecycle
//!
//! ```text
//! Unconfigured --configure--> Configuring --ok--> Connecting <--> Open
//!       ^                          |                   |           |
//!       +---------fail-------------+                   +--dispose--+--> Closed
//! ```
//!
//! Transport drops while the session is live map back to `Connecting`; the
//! transport keeps retrying underneath. `Closed` is terminal and reached
//! only through [`ConnectionManager::dispose`].

use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::messages::{ConnectionState, Envelope};
use crate::transport::{ChatTransport, TransportError, TransportEvent};

/// Something the connection layer wants the engine to know about
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The lifecycle state changed
    StateChanged(ConnectionState),
    /// One raw inbound frame, ready for normalization
    Frame(String),
}

/// Connection lifecycle and send gating over a [`ChatTransport`]
pub struct ConnectionManager<T: ChatTransport> {
    transport: T,
    http: reqwest::Client,
    config: EngineConfig,
    state: ConnectionState,
}

impl<T: ChatTransport> ConnectionManager<T> {
    /// Create a manager over the given transport.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be constructed (malformed TLS
    /// backend setup, which cannot happen with default features).
    #[must_use]
    pub fn new(transport: T, config: EngineConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            transport,
            http,
            config,
            state: ConnectionState::Unconfigured,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run the database configuration handshake, then connect.
    ///
    /// Sends `POST /configure-database` with `{"database_url": url}`. On
    /// acceptance the session proceeds to [`ConnectionState::Connecting`];
    /// on any failure it returns to [`ConnectionState::Unconfigured`] so
    /// the caller may retry with a corrected URL. Empty or whitespace-only
    /// URLs are rejected without touching the network.
    pub async fn configure(&mut self, url: &str) -> Result<(), ConfigError> {
        if url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if self.state != ConnectionState::Unconfigured {
            return Err(ConfigError::InvalidState(self.state));
        }

        self.state = ConnectionState::Configuring;
        let endpoint = self.config.configure_endpoint();
        tracing::info!(endpoint = %endpoint, "Configuring database");

        let response = self
            .http
            .post(&endpoint)
            .json(&serde_json::json!({ "database_url": url }))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                self.state = ConnectionState::Unconfigured;
                tracing::warn!(error = %e, "Configuration request failed");
                return Err(ConfigError::Network(e.to_string()));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let detail = rejection_detail(response, status).await;
            self.state = ConnectionState::Unconfigured;
            tracing::warn!(status = %status, detail = %detail, "Configuration rejected");
            return Err(ConfigError::Rejected(detail));
        }

        tracing::info!("Database configured");
        self.connect().await.map_err(|e| match e {
            TransportError::Closed => ConfigError::InvalidState(ConnectionState::Closed),
            other => ConfigError::Network(other.to_string()),
        })
    }

    /// Start establishing the chat link.
    ///
    /// Idempotent while connecting or open. Fails after disposal, and in
    /// [`ConnectionState::Unconfigured`] when the config requires the
    /// handshake to happen first.
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => return Ok(()),
            ConnectionState::Closed => return Err(TransportError::Closed),
            ConnectionState::Unconfigured if self.config.require_configuration => {
                return Err(TransportError::InvalidState(
                    "configuration required before connecting".to_string(),
                ));
            }
            ConnectionState::Unconfigured | ConnectionState::Configuring => {}
        }

        self.state = ConnectionState::Connecting;
        self.transport.connect().await
    }

    /// Send one request envelope, gated on the link being open
    pub async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        if self.state != ConnectionState::Open {
            return Err(TransportError::NotConnected);
        }
        let frame = serde_json::to_string(envelope)
            .map_err(|e| TransportError::SerializationError(e.to_string()))?;
        self.transport.send(frame).await
    }

    /// Await the next connection event.
    ///
    /// Translates transport events into lifecycle transitions: `Up` means
    /// [`ConnectionState::Open`], `Down` means back to
    /// [`ConnectionState::Connecting`] while the transport retries. Events
    /// that do not change the observable state are swallowed. Returns
    /// `None` once the transport is done for good.
    pub async fn poll_event(&mut self) -> Option<ConnectionEvent> {
        loop {
            let event = self.transport.next_event().await?;
            if let Some(out) = self.apply(event) {
                return Some(out);
            }
        }
    }

    /// Non-blocking variant of [`ConnectionManager::poll_event`]
    pub fn try_poll_event(&mut self) -> Option<ConnectionEvent> {
        loop {
            let event = self.transport.try_next_event()?;
            if let Some(out) = self.apply(event) {
                return Some(out);
            }
        }
    }

    fn apply(&mut self, event: TransportEvent) -> Option<ConnectionEvent> {
        match event {
            TransportEvent::Up => {
                if self.state == ConnectionState::Closed {
                    return None;
                }
                self.state = ConnectionState::Open;
                tracing::info!("Connection open");
                Some(ConnectionEvent::StateChanged(ConnectionState::Open))
            }
            TransportEvent::Down => {
                if self.state == ConnectionState::Closed {
                    return None;
                }
                self.state = ConnectionState::Connecting;
                tracing::info!("Connection lost, transport retrying");
                Some(ConnectionEvent::StateChanged(ConnectionState::Connecting))
            }
            TransportEvent::Frame(raw) => Some(ConnectionEvent::Frame(raw)),
        }
    }

    /// Tear the session down permanently. Idempotent.
    pub async fn dispose(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.transport.shutdown().await;
        self.state = ConnectionState::Closed;
        tracing::info!("Connection disposed");
    }
}

/// Extract the backend's `detail` message from a rejection body, falling
/// back to a generic description with the status code.
async fn rejection_detail(response: reqwest::Response, status: reqwest::StatusCode) -> String {
    if let Ok(body) = response.json::<serde_json::Value>().await {
        if let Some(detail) = body.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
    }
    format!("backend returned status {status}")
}
