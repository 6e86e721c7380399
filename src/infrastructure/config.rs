//! Configuration file management.
//!
//! Handles loading TOML configuration files; missing files fall back to
//! the built-in defaults.

use std::fs;
use std::path::Path;

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# chat-roster configuration
# Auto-generated - edit as needed

[session]
# Seconds a session may stay idle before it is evicted (default: 3600)
idle_timeout_secs = 3600

# Seconds between reaper sweeps (default: 300 = 5 minutes)
sweep_interval_secs = 300

[limits]
# Maximum number of export files per session
max_files = 10

# Maximum size of a single file in megabytes
max_file_size_mb = 10

# Maximum accumulated upload size per session in megabytes
max_total_size_mb = 100

[output]
# Participant count at which output switches to the workbook document
inline_threshold = 50

# Maximum length of one inline text chunk
max_message_len = 3500
"#;

/// Load configuration from an optional explicit path.
///
/// With no path, the default location under the data dir is tried;
/// a missing file yields the defaults.
///
/// # Errors
/// Returns error if a file exists but cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config_from_file(path),
        None => {
            let default_path = AppConfig::default_data_dir().join("config.toml");
            if default_path.exists() {
                load_config_from_file(&default_path)
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Create the default configuration file if it doesn't exist.
///
/// # Errors
/// Returns error if the file cannot be created.
pub fn ensure_config_exists() -> Result<()> {
    let config_path = AppConfig::default_data_dir().join("config.toml");

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!("created default configuration");
    }

    Ok(())
}
