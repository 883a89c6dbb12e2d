//! datachat-core - Headless Session Engine for the datachat Analytics Client
//!
//! This crate implements the client-side session logic for a natural-language
//! analytics chat backend, completely independent of any UI framework. It can
//! drive a TUI, web UI, native GUI, or run headless for testing/automation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Presentation layer                       │
//! │          (renders ViewModel, calls submit/set_mode)       │
//! └───────────────────────────┬──────────────────────────────┘
//!                             │
//! ┌───────────────────────────┼──────────────────────────────┐
//! │                      ChatEngine                           │
//! │  ┌──────────────┐  ┌────────────┐  ┌──────────────────┐  │
//! │  │ Conversation │  │ Normalizer │  │   Connection     │  │
//! │  │    Store     │  │  (A–D →    │  │   Manager        │  │
//! │  │              │  │  Message)  │  │ (state machine)  │  │
//! │  └──────────────┘  └────────────┘  └────────┬─────────┘  │
//! └─────────────────────────────────────────────┼────────────┘
//!                                               │
//!                                      ChatTransport
//!                              (WebSocket / in-process pair)
//! ```
//!
//! # Key Types
//!
//! - [`ChatEngine`]: The session orchestrator; one per conversation
//! - [`ViewModel`]: Immutable snapshot of everything a UI renders
//! - [`Message`]: The canonical conversation entry every payload shape
//!   normalizes into
//! - [`ConnectionState`]: Five-state connection lifecycle
//! - [`transport::ChatTransport`]: The seam for pluggable transports
//!
//! # Quick Start
//!
//! ```ignore
//! use datachat_core::{ChatEngine, EngineConfig, EngineEvent, Mode};
//! use datachat_core::transport::WebSocketTransport;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = EngineConfig::from_env();
//!     let transport = WebSocketTransport::new(
//!         config.ws_url.clone(),
//!         config.reconnect.clone(),
//!         config.connect_timeout(),
//!     );
//!     let mut engine = ChatEngine::new(transport, config);
//!
//!     engine.connect().await.unwrap();
//!     engine.set_mode(Mode::Database);
//!     engine.submit("Show me total revenue by month").await;
//!
//!     while let Some(event) = engine.next_event().await {
//!         match event {
//!             EngineEvent::Bot(id) => { /* render the new entry */ }
//!             EngineEvent::ConnectionChanged(state) => { /* status line */ }
//!         }
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`messages`]: Canonical conversation and protocol types
//! - [`normalize`]: Backend payload variants → one [`Message`] shape
//! - [`format`]: Pure text-to-blocks formatter for display text
//! - [`store`]: Append-only conversation log
//! - [`connection`]: Connection lifecycle and send gating
//! - [`transport`]: Transport trait, WebSocket and in-process impls
//! - [`engine`]: The session orchestrator
//! - [`config`]: Endpoints, timeouts, reconnect policy
//! - [`error`]: Configuration handshake errors
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on any UI framework. It's pure
//! session logic that can be embedded anywhere.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod format;
pub mod messages;
pub mod normalize;
pub mod store;
pub mod transport;

// Re-exports for convenience
pub use config::{EngineConfig, ReconnectPolicy};
pub use connection::{ConnectionEvent, ConnectionManager};
pub use engine::{ChatEngine, EngineEvent, ViewModel};
pub use error::ConfigError;
pub use format::{format_text, Block, Span};
pub use messages::{ConnectionState, Envelope, Message, MessageId, Mode, Origin, TableRow};
pub use normalize::{normalize, parse_frame, NO_RESPONSE, UNKNOWN_ERROR};
pub use store::ConversationStore;
