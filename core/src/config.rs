//! Engine Configuration
//!
//! Endpoint addresses, timeouts, and the reconnect policy. Everything can
//! be overridden from the environment under the `DATACHAT_*` prefix, with
//! defaults matching the reference backend (`localhost:8000`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff policy for transport reconnection
///
/// Bounded growth, indefinite retries: the transport never gives up on its
/// own, only explicit disposal stops it. Jitter spreads simultaneous
/// reconnect storms when several clients lose the same backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay before the first retry (milliseconds)
    pub initial_delay_ms: u64,
    /// Ceiling for the retry delay (milliseconds)
    pub max_delay_ms: u64,
    /// Growth factor applied after each failed attempt
    pub multiplier: u32,
    /// Whether to add up to 25% random jitter to each delay
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2,
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the first retry
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Next delay after `current`, grown and clamped, with jitter applied
    #[must_use]
    pub fn next_delay(&self, current: Duration) -> Duration {
        let grown = current
            .as_millis()
            .saturating_mul(u128::from(self.multiplier.max(1)));
        let clamped = grown.min(u128::from(self.max_delay_ms)) as u64;
        Duration::from_millis(self.apply_jitter(clamped))
    }

    fn apply_jitter(&self, delay_ms: u64) -> u64 {
        if !self.jitter || delay_ms == 0 {
            return delay_ms;
        }
        let spread = delay_ms / 4;
        if spread == 0 {
            return delay_ms;
        }
        delay_ms + rand::Rng::gen_range(&mut rand::thread_rng(), 0..=spread)
    }
}

/// Engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// WebSocket endpoint for the chat protocol
    pub ws_url: String,
    /// HTTP base URL for the configuration handshake
    pub http_url: String,
    /// Whether a database must be configured before connecting
    pub require_configuration: bool,
    /// Transport handshake timeout (milliseconds)
    pub connect_timeout_ms: u64,
    /// HTTP request timeout for the configuration call (milliseconds)
    pub request_timeout_ms: u64,
    /// Reconnect backoff policy
    pub reconnect: ReconnectPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000/ws".to_string(),
            http_url: "http://localhost:8000".to_string(),
            require_configuration: false,
            connect_timeout_ms: 5000,
            request_timeout_ms: 30_000,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DATACHAT_WS_URL`: WebSocket endpoint
    /// - `DATACHAT_HTTP_URL`: HTTP base URL
    /// - `DATACHAT_REQUIRE_CONFIG`: "1" or "true" to lock the send path
    ///   until a database is configured
    /// - `DATACHAT_CONNECT_TIMEOUT`: handshake timeout in ms
    /// - `DATACHAT_REQUEST_TIMEOUT`: configuration request timeout in ms
    /// - `DATACHAT_RECONNECT_INITIAL`: first retry delay in ms
    /// - `DATACHAT_RECONNECT_MAX`: retry delay ceiling in ms
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let reconnect_defaults = ReconnectPolicy::default();

        Self {
            ws_url: std::env::var("DATACHAT_WS_URL").unwrap_or(defaults.ws_url),
            http_url: std::env::var("DATACHAT_HTTP_URL").unwrap_or(defaults.http_url),
            require_configuration: std::env::var("DATACHAT_REQUIRE_CONFIG")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(defaults.require_configuration),
            connect_timeout_ms: env_u64("DATACHAT_CONNECT_TIMEOUT", defaults.connect_timeout_ms),
            request_timeout_ms: env_u64("DATACHAT_REQUEST_TIMEOUT", defaults.request_timeout_ms),
            reconnect: ReconnectPolicy {
                initial_delay_ms: env_u64(
                    "DATACHAT_RECONNECT_INITIAL",
                    reconnect_defaults.initial_delay_ms,
                ),
                max_delay_ms: env_u64("DATACHAT_RECONNECT_MAX", reconnect_defaults.max_delay_ms),
                ..reconnect_defaults
            },
        }
    }

    /// Create a config suitable for tests (short timers, no jitter)
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            connect_timeout_ms: 200,
            request_timeout_ms: 500,
            reconnect: ReconnectPolicy {
                initial_delay_ms: 10,
                max_delay_ms: 50,
                multiplier: 2,
                jitter: false,
            },
            ..Self::default()
        }
    }

    /// Full URL of the configuration endpoint
    #[must_use]
    pub fn configure_endpoint(&self) -> String {
        format!("{}/configure-database", self.http_url.trim_end_matches('/'))
    }

    /// Transport handshake timeout
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Configuration request timeout
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
