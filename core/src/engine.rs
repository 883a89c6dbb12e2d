//! Session Engine
//!
//! The orchestrator: one engine per conversation session, tying the store,
//! the normalizer, and the connection manager together. Consumers interact
//! only through the engine's surface — submit a query, pump events, read
//! the view model — and never touch the transport or the store directly.
//!
//! # Design Philosophy
//!
//! The engine is single-threaded over its own state: all mutation happens
//! inside its methods, called from one task. The transport's concurrency is
//! hidden behind the event pump, so there is no locking anywhere in the
//! session path. Presentation layers render from [`ViewModel`] snapshots
//! and remain free of protocol knowledge.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::connection::{ConnectionEvent, ConnectionManager};
use crate::error::ConfigError;
use crate::messages::{ConnectionState, Envelope, Message, MessageId, Mode};
use crate::normalize::parse_frame;
use crate::store::ConversationStore;
use crate::transport::{ChatTransport, TransportError};

/// Shown when an inbound frame is not decodable JSON
const UNREADABLE_FRAME: &str = "Error: Received an unreadable response from the server.";

/// Something that changed and may need rendering
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// A bot entry was appended to the conversation
    Bot(MessageId),
    /// The connection lifecycle state changed
    ConnectionChanged(ConnectionState),
}

/// Immutable snapshot of everything a presentation layer renders
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewModel {
    /// Conversation log, oldest first
    pub messages: Vec<Message>,
    /// Whether a reply is outstanding
    pub pending: bool,
    /// Currently selected query mode
    pub mode: Mode,
    /// Connection lifecycle state
    pub connection: ConnectionState,
}

/// One conversation session over a [`ChatTransport`]
pub struct ChatEngine<T: ChatTransport> {
    store: ConversationStore,
    connection: ConnectionManager<T>,
}

impl<T: ChatTransport> ChatEngine<T> {
    /// Create an engine over the given transport. The session starts
    /// unconfigured with an empty conversation.
    #[must_use]
    pub fn new(transport: T, config: EngineConfig) -> Self {
        Self {
            store: ConversationStore::new(),
            connection: ConnectionManager::new(transport, config),
        }
    }

    /// Run the database configuration handshake, then connect
    pub async fn configure(&mut self, url: &str) -> Result<(), ConfigError> {
        self.connection.configure(url).await
    }

    /// Start establishing the chat link (idempotent)
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        self.connection.connect().await
    }

    /// Submit one user query.
    ///
    /// No-op when the text is empty or whitespace-only, or when the link
    /// is not open; in both cases nothing is appended and nothing is sent.
    /// Otherwise the exact text (untrimmed) becomes a USER entry, a reply
    /// is marked outstanding, and one envelope goes out. A send failure
    /// after the gate check is logged and dropped; the conversation entry
    /// stays.
    pub async fn submit(&mut self, text: &str) -> Option<MessageId> {
        if text.trim().is_empty() {
            return None;
        }
        if self.connection.state() != ConnectionState::Open {
            tracing::debug!("Submit ignored: link not open");
            return None;
        }

        let envelope = Envelope {
            message: text.to_string(),
            mode: self.store.mode(),
        };
        let id = self.store.push(Message::user(text));
        self.store.set_pending(true);

        if let Err(e) = self.connection.send(&envelope).await {
            tracing::warn!(error = %e, "Dropped outbound query");
        }
        Some(id)
    }

    /// Ingest one raw inbound frame.
    ///
    /// Appends exactly one bot entry per frame and resolves the pending
    /// flag. Undecodable frames become a single client-local error entry.
    ///
    /// Replies carry no correlation ids; they are matched to requests by
    /// arrival order. A backend that reorders replies across concurrent
    /// requests would pair them with the wrong question, invisibly.
    pub fn ingest_frame(&mut self, raw: &str) -> MessageId {
        let message = match parse_frame(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable inbound frame");
                Message::error(UNREADABLE_FRAME)
            }
        };
        self.store.set_pending(false);
        self.store.push(message)
    }

    /// Switch the query mode for subsequent sends
    pub fn set_mode(&mut self, mode: Mode) {
        self.store.set_mode(mode);
    }

    /// Currently selected query mode
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.store.mode()
    }

    /// Current connection lifecycle state
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Conversation log, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// Snapshot the full renderable state.
    ///
    /// Pure with respect to the session: taking a snapshot never mutates
    /// anything, and repeated calls without intervening events are equal.
    #[must_use]
    pub fn view_model(&self) -> ViewModel {
        ViewModel {
            messages: self.store.messages().to_vec(),
            pending: self.store.pending(),
            mode: self.store.mode(),
            connection: self.connection.state(),
        }
    }

    /// Await the next engine event, ingesting frames along the way.
    ///
    /// Returns `None` once the session is disposed and drained.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        match self.connection.poll_event().await? {
            ConnectionEvent::StateChanged(state) => Some(EngineEvent::ConnectionChanged(state)),
            ConnectionEvent::Frame(raw) => Some(EngineEvent::Bot(self.ingest_frame(&raw))),
        }
    }

    /// Non-blocking variant of [`ChatEngine::next_event`]
    pub fn try_next_event(&mut self) -> Option<EngineEvent> {
        match self.connection.try_poll_event()? {
            ConnectionEvent::StateChanged(state) => Some(EngineEvent::ConnectionChanged(state)),
            ConnectionEvent::Frame(raw) => Some(EngineEvent::Bot(self.ingest_frame(&raw))),
        }
    }

    /// Tear the session down permanently. Idempotent; the conversation log
    /// remains readable afterwards.
    pub async fn dispose(&mut self) {
        self.connection.dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{InProcessTransport, TransportEvent};
    use pretty_assertions::assert_eq;

    async fn open_engine() -> (
        ChatEngine<InProcessTransport>,
        tokio::sync::mpsc::Receiver<String>,
        tokio::sync::mpsc::Sender<TransportEvent>,
    ) {
        let (transport, frames, inject) = InProcessTransport::new_pair();
        let mut engine = ChatEngine::new(transport, EngineConfig::for_testing());
        engine.connect().await.unwrap();
        assert_eq!(
            engine.next_event().await,
            Some(EngineEvent::ConnectionChanged(ConnectionState::Open))
        );
        (engine, frames, inject)
    }

    #[tokio::test]
    async fn test_submit_appends_user_and_sets_pending() {
        let (mut engine, mut frames, _inject) = open_engine().await;

        let id = engine.submit("What is our best seller?").await.unwrap();
        let vm = engine.view_model();
        assert_eq!(vm.messages.len(), 1);
        assert_eq!(vm.messages[0].id, id);
        assert_eq!(vm.messages[0].text, "What is our best seller?");
        assert!(vm.pending);

        assert_eq!(
            frames.recv().await.unwrap(),
            r#"{"message":"What is our best seller?","mode":"general"}"#
        );
    }

    #[tokio::test]
    async fn test_submit_keeps_text_untrimmed() {
        let (mut engine, mut frames, _inject) = open_engine().await;

        engine.submit("  padded  ").await.unwrap();
        assert_eq!(engine.messages()[0].text, "  padded  ");
        assert_eq!(
            frames.recv().await.unwrap(),
            r#"{"message":"  padded  ","mode":"general"}"#
        );
    }

    #[tokio::test]
    async fn test_submit_empty_is_noop() {
        let (mut engine, _frames, _inject) = open_engine().await;

        assert!(engine.submit("").await.is_none());
        assert!(engine.submit("   \n\t ").await.is_none());
        assert!(engine.messages().is_empty());
        assert!(!engine.view_model().pending);
    }

    #[tokio::test]
    async fn test_submit_before_open_is_noop() {
        let (transport, _frames, _inject) = InProcessTransport::new_pair();
        let mut engine = ChatEngine::new(transport, EngineConfig::for_testing());

        assert!(engine.submit("hello").await.is_none());
        assert!(engine.messages().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_resolves_pending() {
        let (mut engine, _frames, inject) = open_engine().await;
        engine.submit("q").await.unwrap();
        assert!(engine.view_model().pending);

        inject
            .send(TransportEvent::Frame(
                r#"{"response":"Our best seller is the anvil."}"#.to_string(),
            ))
            .await
            .unwrap();

        let event = engine.next_event().await.unwrap();
        let EngineEvent::Bot(id) = event else {
            panic!("expected a bot event, got {event:?}");
        };
        let vm = engine.view_model();
        assert!(!vm.pending);
        assert_eq!(vm.messages.len(), 2);
        assert_eq!(vm.messages[1].id, id);
        assert_eq!(vm.messages[1].text, "Our best seller is the anvil.");
    }

    #[tokio::test]
    async fn test_undecodable_frame_becomes_one_error_entry() {
        let (mut engine, _frames, _inject) = open_engine().await;
        engine.submit("q").await.unwrap();

        engine.ingest_frame("not json {{{");
        let vm = engine.view_model();
        assert_eq!(vm.messages.len(), 2);
        assert!(vm.messages[1].is_error);
        assert_eq!(vm.messages[1].text, UNREADABLE_FRAME);
        assert!(!vm.pending);
    }

    #[tokio::test]
    async fn test_mode_sticky_and_attached_at_submit_time() {
        let (mut engine, mut frames, _inject) = open_engine().await;

        engine.set_mode(Mode::Database);
        engine.submit("revenue?").await.unwrap();
        assert_eq!(
            frames.recv().await.unwrap(),
            r#"{"message":"revenue?","mode":"company"}"#
        );

        // Mode change after the send does not rewrite history.
        engine.set_mode(Mode::General);
        assert_eq!(engine.mode(), Mode::General);
    }

    #[tokio::test]
    async fn test_view_model_is_pure() {
        let (mut engine, _frames, _inject) = open_engine().await;
        engine.submit("q").await.unwrap();

        let a = engine.view_model();
        let b = engine.view_model();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_dispose_preserves_log() {
        let (mut engine, _frames, _inject) = open_engine().await;
        engine.submit("q").await.unwrap();
        engine.ingest_frame(r#"{"response":"a"}"#);

        engine.dispose().await;
        engine.dispose().await;
        assert_eq!(engine.connection_state(), ConnectionState::Closed);
        assert_eq!(engine.messages().len(), 2);
        assert!(engine.next_event().await.is_none());
        assert!(engine.submit("again").await.is_none());
    }
}
