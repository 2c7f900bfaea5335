//! TOML-based configuration persistence for the chatbox sender.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\ChatboxSender\config.toml`
//! - Linux:    `~/.config/chatbox-sender/config.toml`
//! - macOS:    `~/Library/Application Support/ChatboxSender/config.toml`
//!
//! Example file:
//!
//! ```toml
//! [sender]
//! destination = "127.0.0.1:9000"
//! auto_send = true
//!
//! [rate_limit]
//! buffer_delay_ms = 750
//! ```
//!
//! Every field has a serde default, so a partial file (or none at all) yields
//! a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::rate_limiter::RateLimitPolicy;
use crate::application::send_coordinator::SendPolicy;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Sender behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SenderConfig {
    /// OSC endpoint as `IP:PORT` (or a bare IP for port 9000).
    #[serde(default = "default_destination")]
    pub destination: String,
    /// Whether `~`-prefixed draft lines are soft-sent.
    #[serde(default)]
    pub auto_send: bool,
    /// Whether the text is cleared after a submitted message.
    #[serde(default = "default_true")]
    pub clear_on_send: bool,
    /// Whether typing indicators are sent.
    #[serde(default = "default_true")]
    pub send_typing: bool,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Rate limiting and debounce settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum messages per window.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Sliding window length in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Extra delay added to each deferred retry, in milliseconds.
    #[serde(default = "default_buffer_delay_ms")]
    pub buffer_delay_ms: u64,
    /// Minimum spacing between soft sends, in milliseconds.
    #[serde(default = "default_soft_debounce_ms")]
    pub soft_debounce_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_destination() -> String {
    "127.0.0.1:9000".to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_capacity() -> usize {
    3
}
fn default_window_ms() -> u64 {
    5000
}
fn default_buffer_delay_ms() -> u64 {
    500
}
fn default_soft_debounce_ms() -> u64 {
    1000
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            auto_send: false,
            clear_on_send: default_true(),
            send_typing: default_true(),
            log_level: default_log_level(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            window_ms: default_window_ms(),
            buffer_delay_ms: default_buffer_delay_ms(),
            soft_debounce_ms: default_soft_debounce_ms(),
        }
    }
}

impl AppConfig {
    /// Builds the coordinator policy described by this configuration.
    pub fn send_policy(&self) -> SendPolicy {
        let rl = &self.rate_limit;
        SendPolicy {
            rate_limit: RateLimitPolicy {
                capacity: rl.capacity,
                window: Duration::from_millis(rl.window_ms),
                buffer_delay: Duration::from_millis(rl.buffer_delay_ms),
            },
            soft_debounce: Duration::from_millis(rl.soft_debounce_ms),
            typing_enabled: self.sender.send_typing,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<PathBuf, ConfigError> {
    let path = config_file_path()?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("ChatboxSender"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("chatbox-sender"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("ChatboxSender")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
