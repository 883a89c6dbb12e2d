//! Configuration Errors
//!
//! Failures of the pre-connection configuration handshake. These are
//! surfaced synchronously to the caller of `configure`; they never enter
//! the conversation log, and the session stays in `Unconfigured` so the
//! user may retry.
//!
//! Transport-level errors live in [`crate::transport::TransportError`].

use thiserror::Error;

use crate::messages::ConnectionState;

/// Why a configuration request failed
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The URL was empty or whitespace; rejected before any network call
    #[error("database URL must not be empty")]
    EmptyUrl,

    /// Configuration is only accepted in the `Unconfigured` state
    #[error("cannot configure while in state: {0}")]
    InvalidState(ConnectionState),

    /// The backend rejected the configuration (non-2xx response)
    ///
    /// Carries the backend's `detail` message when it sent one, otherwise
    /// a generic description including the status code.
    #[error("configuration rejected: {0}")]
    Rejected(String),

    /// The request never completed (connection refused, timeout, ...)
    #[error("configuration request failed: {0}")]
    Network(String),
}
