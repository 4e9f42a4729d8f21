//! Configuration types for the capture client.

use crate::errors::RfbError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete capture-client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Black-frame mitigation policy for capture operations.
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port (typically 5900 + display number).
    pub port: u16,
    /// VNC password (required only when the server offers VNC
    /// authentication and nothing weaker).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Wall-clock deadline for each protocol operation, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Black-frame mitigation policy.
///
/// Some servers return spurious all-black updates while they are still
/// cold-starting their renderer. Capture operations retry a bounded number
/// of times with linearly increasing backoff, optionally provoking the
/// server with harmless input between attempts. The heuristic cannot tell
/// a stale buffer from a genuinely black screen, so a black target screen
/// is an expected false negative; disable retries entirely by setting
/// `max_attempts` to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts before falling back to the cached frame.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff step; attempt `n` sleeps `n * backoff_step_ms`.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
    /// Send a pointer nudge / modifier tap between attempts to provoke a
    /// redraw.
    #[serde(default = "default_true")]
    pub send_nudges: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_step_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step_ms(),
            send_nudges: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig {
                host: String::new(),
                port: 5900,
                password: None,
                timeout_ms: default_timeout_ms(),
            },
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfbError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RfbError::Config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| RfbError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), RfbError> {
        if self.connection.host.is_empty() {
            return Err(RfbError::Config("host cannot be empty".to_string()));
        }
        if self.connection.port == 0 {
            return Err(RfbError::Config("port cannot be 0".to_string()));
        }
        if self.connection.timeout_ms == 0 {
            return Err(RfbError::Config("timeout cannot be 0".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(RfbError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the per-operation deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.connection.timeout_ms)
    }
}

/// Builder for creating a [`Config`].
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the server hostname or IP address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.connection.host = host.into();
        self
    }

    /// Sets the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.connection.port = port;
        self
    }

    /// Sets the VNC password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.connection.password = Some(password.into());
        self
    }

    /// Sets the per-operation deadline in milliseconds.
    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.connection.timeout_ms = timeout_ms;
        self
    }

    /// Replaces the black-frame mitigation policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<Config, RfbError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
