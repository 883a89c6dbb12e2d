//! Transport Layer
//!
//! Abstraction over the mechanism that carries frames between the client
//! and the backend:
//! - `WebSocket`: the production transport, with automatic reconnection
//! - `InProcess`: direct channel communication for tests and embedding
//!
//! # Design Philosophy
//!
//! A transport maintains one logical link and reports its life through
//! [`TransportEvent`]s. Reconnection is the transport's job; the connection
//! manager only translates link events into session state. Frames are
//! opaque text here — encoding and normalization happen above this layer.

pub mod in_process;
pub mod traits;
pub mod websocket;

// Re-exports for convenience
pub use in_process::InProcessTransport;
pub use traits::{ChatTransport, TransportError, TransportEvent};
pub use websocket::WebSocketTransport;
