mod config;
pub mod database;

pub use config::{Config, IdentityConfig, PlaybackConfig, TimerConfig};
pub use database::{Database, PhaseRecord, Stats};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `BREAKDOWN_DATA_DIR` wins when set. Otherwise `~/.config/breakdown[-dev]/`
/// based on `BREAKDOWN_ENV` (set `BREAKDOWN_ENV=dev` for a development
/// directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("BREAKDOWN_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BREAKDOWN_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("breakdown-dev")
            } else {
                base_dir.join("breakdown")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
