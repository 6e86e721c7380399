//! Application configuration types.
//!
//! Values only; the TOML sourcing lives in the infrastructure layer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for per-user sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds a session may stay idle before the reaper evicts it.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Seconds between reaper sweeps. Independent of the idle timeout.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

const fn default_idle_timeout_secs() -> u64 {
    3600 // 1 hour
}

const fn default_sweep_interval_secs() -> u64 {
    300 // 5 minutes
}

/// Upload limits enforced by the orchestrator before queueing a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of files per session.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum size of a single file in megabytes.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Maximum accumulated size across a session in megabytes.
    #[serde(default = "default_max_total_size_mb")]
    pub max_total_size_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size_mb: default_max_file_size_mb(),
            max_total_size_mb: default_max_total_size_mb(),
        }
    }
}

const fn default_max_files() -> usize {
    10
}

const fn default_max_file_size_mb() -> u64 {
    10
}

const fn default_max_total_size_mb() -> u64 {
    100
}

impl LimitsConfig {
    /// Per-file cap in bytes.
    pub const fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Total cap in bytes.
    pub const fn max_total_size_bytes(&self) -> u64 {
        self.max_total_size_mb * 1024 * 1024
    }
}

/// Output shaping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Participant count at which output switches to the workbook format.
    #[serde(default = "default_inline_threshold")]
    pub inline_threshold: usize,

    /// Maximum length of one inline text chunk.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            inline_threshold: default_inline_threshold(),
            max_message_len: default_max_message_len(),
        }
    }
}

const fn default_inline_threshold() -> usize {
    50
}

const fn default_max_message_len() -> usize {
    3500
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Upload limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Output shaping settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Directory for queued upload blobs. Defaults under the user data dir.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Default data directory (`~/.chat-roster` equivalent per platform).
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("chat-roster")
    }

    /// Directory where queued upload blobs are stored.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("uploads"))
    }
}
