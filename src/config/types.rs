//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;

/// Connection settings for the OBS WebSocket server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObsConfig {
    /// Host running OBS.
    pub host: String,
    /// OBS WebSocket port.
    pub port: u16,
    /// Optional server password. An empty string disables authentication.
    pub password: Option<String>,
    /// Upper bound for the handshake and for each request, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 4455,
            password: None,
            request_timeout_ms: 5000,
        }
    }
}

impl ObsConfig {
    /// WebSocket URL of the OBS server.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if host and port do not form a valid URL.
    pub fn url(&self) -> Result<Url, ConfigError> {
        let raw = format!("ws://{}:{}", self.host, self.port);
        Url::parse(&raw).map_err(|e| ConfigError::Invalid(format!("obs url {raw}: {e}")))
    }

    /// Password to authenticate with, treating an empty string as none.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Where the tailer starts reading when the bridge launches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    /// Replay the whole existing log.
    #[default]
    Beginning,
    /// Only react to lines appended after launch.
    End,
}

/// Sunshine log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SunshineConfig {
    /// Path to the Sunshine log file.
    pub log_path: PathBuf,
    /// Interval between polls, in milliseconds.
    pub poll_interval_ms: u64,
    pub start_position: StartPosition,
}

fn default_log_path() -> PathBuf {
    dirs::config_dir().map_or_else(
        || PathBuf::from("sunshine.log"),
        |dir| dir.join("sunshine").join("sunshine.log"),
    )
}

impl Default for SunshineConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            poll_interval_ms: 1000,
            start_position: StartPosition::default(),
        }
    }
}

impl SunshineConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Local control channel settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ControlConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8765,
        }
    }
}

impl ControlConfig {
    /// Address to bind, as `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Recording behaviour outside of the log-driven transitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecordingConfig {
    /// Start a recording as soon as the bridge is connected to OBS.
    pub start_on_launch: bool,
}

/// Operator console settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Read single-key commands from stdin.
    pub enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Top-level configuration for the bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    pub obs: ObsConfig,
    pub sunshine: SunshineConfig,
    pub control: ControlConfig,
    pub recording: RecordingConfig,
    pub console: ConsoleConfig,
}

impl BridgeConfig {
    /// Check values that deserialize fine but cannot work at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.obs.host.trim().is_empty() {
            return Err(ConfigError::Invalid("obs.host must not be empty".into()));
        }
        if self.obs.port == 0 {
            return Err(ConfigError::Invalid("obs.port must not be 0".into()));
        }
        if self.obs.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "obs.request_timeout_ms must be positive".into(),
            ));
        }
        if self.sunshine.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sunshine.poll_interval_ms must be positive".into(),
            ));
        }
        if self.sunshine.log_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "sunshine.log_path must not be empty".into(),
            ));
        }
        self.obs.url()?;
        Ok(())
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub log_path: Option<PathBuf>,
    pub control_port: Option<u16>,
    pub no_console: bool,
}

impl RunOverrides {
    /// Write the given values into `config`.
    pub fn apply(self, config: &mut BridgeConfig) {
        if let Some(log_path) = self.log_path {
            config.sunshine.log_path = log_path;
        }
        if let Some(port) = self.control_port {
            config.control.port = port;
        }
        if self.no_console {
            config.console.enabled = false;
        }
    }
}
