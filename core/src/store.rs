//! Conversation Store
//!
//! Append-only log of conversation entries plus the derived UI flags.
//! Insertion order is chronological order; entries are never reordered or
//! mutated after insert. The session engine is the store's only writer.

use crate::messages::{Message, MessageId, Mode};

/// Append-only conversation state for one session
#[derive(Debug, Default)]
pub struct ConversationStore {
    /// Conversation log, oldest first
    messages: Vec<Message>,
    /// True between a user send and the matching bot reply or error
    pending: bool,
    /// Sticky query mode attached to outgoing envelopes
    mode: Mode,
}

impl ConversationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry and return its ID
    pub fn push(&mut self, message: Message) -> MessageId {
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// All entries, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Look an entry up by ID
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a reply is outstanding
    #[must_use]
    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Mark a reply outstanding (or resolved)
    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    /// Current query mode
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch the query mode for subsequent sends.
    ///
    /// Past entries and in-flight requests are unaffected.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }
}
