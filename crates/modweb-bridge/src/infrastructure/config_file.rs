//! TOML configuration file loading.
//!
//! The bridge reads its settings from a `config.toml` next to the binary (or
//! wherever `--config` points).  First-run behaviour is deliberately
//! forgiving:
//!
//! - Missing file → create it populated with the defaults, then use them.
//! - Unparseable file → log a warning and fall back to the defaults rather
//!   than refusing to start.
//!
//! Fields absent from an existing file take their defaults individually via
//! `#[serde(default = …)]`, so a config written by an older version keeps
//! working after an upgrade.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The default config could not be serialized for first-run creation.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// On-disk configuration schema.
///
/// ```toml
/// server_ip = "localhost"
/// server_port = 5020
/// start_address = 0
/// quantity = 2
/// delay_seconds = 1
/// web_ui_port = 8080
/// slave_id = 1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Hostname or IP of the Modbus TCP device.
    #[serde(default = "default_server_ip")]
    pub server_ip: String,
    /// TCP port of the Modbus TCP device.
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// First holding register address to poll.
    #[serde(default)]
    pub start_address: u16,
    /// Number of consecutive registers to poll.
    #[serde(default = "default_quantity")]
    pub quantity: u16,
    /// Seconds between polling ticks (minimum 1).
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    /// Port the WebSocket server listens on.
    #[serde(default = "default_web_ui_port")]
    pub web_ui_port: u16,
    /// Modbus unit (slave) identifier.
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,
}

fn default_server_ip() -> String {
    "localhost".to_string()
}

fn default_server_port() -> u16 {
    5020
}

fn default_quantity() -> u16 {
    2
}

fn default_delay_seconds() -> u64 {
    1
}

fn default_web_ui_port() -> u16 {
    8080
}

fn default_slave_id() -> u8 {
    1
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            server_ip: default_server_ip(),
            server_port: default_server_port(),
            start_address: 0,
            quantity: default_quantity(),
            delay_seconds: default_delay_seconds(),
            web_ui_port: default_web_ui_port(),
            slave_id: default_slave_id(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads the configuration from `path`, creating the file with default
/// values if it does not exist.
///
/// An existing but unparseable file produces a warning and the defaults; a
/// half-broken config should never keep the bridge from starting.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read or the default
/// file cannot be written.
pub fn load_or_create(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        let defaults = FileConfig::default();
        info!(
            "{} not found; creating it with default values",
            path.display()
        );
        let text = toml::to_string_pretty(&defaults)?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(defaults);
    }

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match toml::from_str(&text) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            warn!(
                "error loading {}: {e}; using default configuration",
                path.display()
            );
            Ok(FileConfig::default())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Returns a unique path under the system temp directory so parallel
    /// tests never collide.
    fn temp_config_path(label: &str) -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "modweb_config_{label}_{}_{n}.toml",
            std::process::id()
        ))
    }

    #[test]
    fn test_default_values() {
        let cfg = FileConfig::default();
        assert_eq!(cfg.server_ip, "localhost");
        assert_eq!(cfg.server_port, 5020);
        assert_eq!(cfg.start_address, 0);
        assert_eq!(cfg.quantity, 2);
        assert_eq!(cfg.delay_seconds, 1);
        assert_eq!(cfg.web_ui_port, 8080);
        assert_eq!(cfg.slave_id, 1);
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let path = temp_config_path("create");

        let cfg = load_or_create(&path).unwrap();
        assert_eq!(cfg, FileConfig::default());
        assert!(path.exists(), "config file must be created on first run");

        // Loading again reads the file that was just written.
        let again = load_or_create(&path).unwrap();
        assert_eq!(again, cfg);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_existing_file_values_are_used() {
        let path = temp_config_path("existing");
        std::fs::write(
            &path,
            "server_ip = \"192.168.1.50\"\nserver_port = 502\nquantity = 8\n",
        )
        .unwrap();

        let cfg = load_or_create(&path).unwrap();
        assert_eq!(cfg.server_ip, "192.168.1.50");
        assert_eq!(cfg.server_port, 502);
        assert_eq!(cfg.quantity, 8);
        // Absent fields fall back to their individual defaults.
        assert_eq!(cfg.delay_seconds, 1);
        assert_eq!(cfg.slave_id, 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let path = temp_config_path("invalid");
        std::fs::write(&path, "this is { not valid toml").unwrap();

        let cfg = load_or_create(&path).unwrap();
        assert_eq!(cfg, FileConfig::default());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_written_defaults_round_trip() {
        let text = toml::to_string_pretty(&FileConfig::default()).unwrap();
        let back: FileConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, FileConfig::default());
    }
}
