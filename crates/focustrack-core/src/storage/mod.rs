mod config;
pub mod database;
pub mod migrations;
pub mod mirror;
mod record;
pub mod sinks;

pub use config::{Config, LoggingConfig, NotificationsConfig, RemoteConfig, TimerDefaults};
pub use database::{Database, SessionStore};
pub use mirror::{HttpMirror, MirrorFuture, RemoteMirror};
pub use record::SessionRecord;
pub use sinks::{PersistOutcome, SessionSinks};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// Resolution order:
/// - `FOCUSTRACK_DATA_DIR`, used verbatim
/// - `~/.config/focustrack-dev/` when `FOCUSTRACK_ENV=dev`
/// - `~/.config/focustrack/`
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("FOCUSTRACK_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSTRACK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focustrack-dev")
            } else {
                base_dir.join("focustrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
