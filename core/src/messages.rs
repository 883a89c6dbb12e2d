//! Protocol and Conversation Types
//!
//! The canonical data model shared by the store, the normalizer, and the
//! connection layer. Every backend payload variant is reconciled into the
//! single [`Message`] shape defined here; the presentation layer only ever
//! sees these types.
//!
//! # Design Philosophy
//!
//! The backend speaks several slightly different JSON dialects for the same
//! semantic content. Rather than letting that leak through the codebase,
//! everything downstream of the normalizer works with one canonical message
//! type. Messages are immutable once created and the conversation log is
//! append-only.

use serde::{Deserialize, Serialize};

/// One row of a tabular query result.
///
/// Keys are column names; values may be scalars or nested structures.
/// Nested values are rendered as their JSON encoding by consumers.
pub type TableRow = serde_json::Map<String, serde_json::Value>;

/// Message identifier, unique within the process
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who authored a conversation entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Typed by the user
    User,
    /// Produced by the backend (or a client-local diagnostic)
    Bot,
}

/// Query intent attached to every outgoing envelope
///
/// Sticky: the engine keeps the last selected mode until the user toggles
/// it. The wire encoding (`general` / `company`) is what the backend
/// expects; [`Mode::Database`] is the client-side name for company mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Free-form conversation, no SQL generation
    #[default]
    #[serde(rename = "general")]
    General,
    /// Database-backed query against the configured company database
    #[serde(rename = "company")]
    Database,
}

impl Mode {
    /// Human-readable label for UI toggles
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::General => "General Chat",
            Self::Database => "Database Mode",
        }
    }
}

/// Outbound request envelope
///
/// Serialized as-is into one WebSocket text frame:
/// `{ "message": "...", "mode": "general" | "company" }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The user's query text, forwarded verbatim
    pub message: String,
    /// The mode selected at submit time
    pub mode: Mode,
}

/// A single conversation entry, immutable once created
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who authored this entry
    pub origin: Origin,
    /// Canonical display text (a fallback string for bot entries that
    /// carried no answer)
    pub text: String,
    /// Whether this entry reports a failure
    pub is_error: bool,
    /// Generated SQL, present only for bot entries that included one
    pub sql: Option<String>,
    /// Tabular result rows, present only for bot entries that included one
    pub table: Option<Vec<TableRow>>,
    /// When the entry was created (Unix timestamp ms)
    pub timestamp: u64,
}

impl Message {
    /// Create a user entry carrying the exact submitted text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            origin: Origin::User,
            text: text.into(),
            is_error: false,
            sql: None,
            table: None,
            timestamp: now_ms(),
        }
    }

    /// Create a successful bot entry
    pub fn bot(text: impl Into<String>, sql: Option<String>, table: Option<Vec<TableRow>>) -> Self {
        Self {
            id: MessageId::new(),
            origin: Origin::Bot,
            text: text.into(),
            is_error: false,
            sql,
            table,
            timestamp: now_ms(),
        }
    }

    /// Create a bot entry that reports a failure
    ///
    /// Used both for backend-reported errors and for client-local
    /// diagnostics (e.g. an undecodable frame). Never carries SQL or rows.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            origin: Origin::Bot,
            text: text.into(),
            is_error: true,
            sql: None,
            table: None,
            timestamp: now_ms(),
        }
    }

    /// Column names for the tabular result, derived from row 0 only.
    ///
    /// Later rows with extra or missing keys are rendered as-is against
    /// this fixed column set. This mirrors the backend contract where all
    /// rows share the first row's key set; it is not corrected client-side.
    #[must_use]
    pub fn table_columns(&self) -> Vec<String> {
        self.table
            .as_ref()
            .and_then(|rows| rows.first())
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Connection lifecycle states
///
/// Owned by the connection manager; the only writer of this state. The
/// terminal state is [`ConnectionState::Closed`], reached exclusively via
/// explicit disposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No database configured yet (send path locked)
    Unconfigured,
    /// Configuration request in flight
    Configuring,
    /// Transport handshake in progress (including automatic reconnects)
    Connecting,
    /// Link established, send path unlocked
    Open,
    /// Session torn down; terminal, no further reconnection
    Closed,
}

impl ConnectionState {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Unconfigured => "Not configured",
            Self::Configuring => "Configuring database...",
            Self::Connecting => "Connecting...",
            Self::Open => "Connected",
            Self::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Get current timestamp in milliseconds
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_unique() {
        let id1 = MessageId::new();
        let id2 = MessageId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_mode_wire_encoding() {
        assert_eq!(serde_json::to_string(&Mode::General).unwrap(), "\"general\"");
        assert_eq!(serde_json::to_string(&Mode::Database).unwrap(), "\"company\"");
    }

    #[test]
    fn test_mode_default_is_general() {
        assert_eq!(Mode::default(), Mode::General);
    }

    #[test]
    fn test_envelope_wire_shape() {
        let env = Envelope {
            message: "Show me total revenue".to_string(),
            mode: Mode::Database,
        };
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"{"message":"Show me total revenue","mode":"company"}"#);
    }

    #[test]
    fn test_user_message() {
        let msg = Message::user("  hello  ");
        assert_eq!(msg.origin, Origin::User);
        assert_eq!(msg.text, "  hello  ");
        assert!(!msg.is_error);
        assert!(msg.sql.is_none());
        assert!(msg.table.is_none());
    }

    #[test]
    fn test_error_message_carries_no_payload() {
        let msg = Message::error("Error: boom");
        assert_eq!(msg.origin, Origin::Bot);
        assert!(msg.is_error);
        assert!(msg.sql.is_none());
        assert!(msg.table.is_none());
    }

    #[test]
    fn test_table_columns_from_first_row_only() {
        let rows: Vec<TableRow> = serde_json::from_str(
            r#"[{"a":1,"b":2},{"a":3,"b":4,"c":5}]"#,
        )
        .unwrap();
        let msg = Message::bot("text", None, Some(rows));
        // Row 1's extra key does not widen the column set.
        assert_eq!(msg.table_columns(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_table_columns_empty_without_table() {
        let msg = Message::bot("text", None, None);
        assert!(msg.table_columns().is_empty());
    }

    #[test]
    fn test_connection_state_description() {
        assert_eq!(ConnectionState::Open.description(), "Connected");
        assert_eq!(ConnectionState::Closed.to_string(), "Closed");
    }
}
