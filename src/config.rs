//! Client configuration
//!
//! All fields are optional when deserializing; missing ones take the defaults
//! the dashboard has always used (5 attempts, 3 s backoff unit).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Origin used to derive the endpoint when none is configured
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";

/// Options for a [`RealtimeClient`](crate::core::RealtimeClient)
///
/// ```rust
/// use gcode_live::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_max_reconnect_attempts(3)
///     .with_reconnect_delay_ms(1000);
/// assert_eq!(config.reconnect_delay().as_millis(), 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Ceiling for automatic reconnect attempts
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Backoff unit; attempt `n` waits `n * reconnect_delay_ms`
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Explicit endpoint, overrides the origin-derived one
    #[serde(default)]
    pub url: Option<String>,

    /// Page origin the default endpoint is derived from
    #[serde(default = "default_origin")]
    pub origin: String,
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            url: None,
            origin: default_origin(),
        }
    }
}

impl ClientConfig {
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Build a config from `GCODE_*` environment variables.
    ///
    /// Unparseable numbers are logged and fall back to the default.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn number<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
            use tracing::warn;

            match raw {
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warn!(key, value = %raw, "Ignoring unparseable setting");
                    default
                }),
                None => default,
            }
        }

        let defaults = Self::default();
        Self {
            max_reconnect_attempts: number(
                "GCODE_MAX_RECONNECT_ATTEMPTS",
                lookup("GCODE_MAX_RECONNECT_ATTEMPTS"),
                defaults.max_reconnect_attempts,
            ),
            reconnect_delay_ms: number(
                "GCODE_RECONNECT_DELAY_MS",
                lookup("GCODE_RECONNECT_DELAY_MS"),
                defaults.reconnect_delay_ms,
            ),
            url: lookup("GCODE_WS_URL").filter(|u| !u.trim().is_empty()),
            origin: lookup("GCODE_ORIGIN").unwrap_or(defaults.origin),
        }
    }
}
