//! Transport Traits
//!
//! The seam between the connection manager and concrete transports.

use async_trait::async_trait;
use thiserror::Error;

/// Transport-level errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// The link could not be established
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A send was attempted while the link is not open
    #[error("not connected")]
    NotConnected,

    /// A frame could not be handed to the link
    #[error("send failed: {0}")]
    SendFailed(String),

    /// A frame could not be serialized for the wire
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The transport was shut down and will not reconnect
    #[error("transport closed")]
    Closed,

    /// The operation is not valid in the current state
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Something that happened on the link
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link came up (initial connect or a successful reconnect)
    Up,
    /// One inbound text frame, undecoded
    Frame(String),
    /// The link dropped; the transport is retrying unless shut down
    Down,
}

/// One logical backend link
///
/// Implementations own the socket (or channel pair) exclusively and are
/// consumed from a single task; interior tasks they spawn must stop after
/// [`ChatTransport::shutdown`].
#[async_trait]
pub trait ChatTransport: Send {
    /// Start maintaining the link. Idempotent: calling again while the
    /// link is being established or is open is a no-op.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Queue exactly one outbound text frame.
    ///
    /// Fails with [`TransportError::NotConnected`] when the link is not
    /// open; queued frames are never retried across reconnects.
    async fn send(&self, frame: String) -> Result<(), TransportError>;

    /// Await the next link event. Returns `None` once the transport has
    /// been shut down and all buffered events are drained.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Non-blocking variant of [`ChatTransport::next_event`]
    fn try_next_event(&mut self) -> Option<TransportEvent>;

    /// Whether the link is currently open
    fn is_open(&self) -> bool;

    /// Tear the link down permanently and stop all reconnection attempts.
    /// Idempotent and safe to call multiple times.
    async fn shutdown(&mut self);
}
