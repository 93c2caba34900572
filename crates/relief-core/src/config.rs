//! Configuration for the scanner.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $RELIEF_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/relief/config.toml
//!   3. ~/.config/relief/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefConfig {
    pub scan: ScanConfig,
    pub rangefinder: RangefinderConfig,
    pub stage: StageConfig,
    pub export: ExportConfig,
}

/// Grid geometry. All lengths in millimeters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Grid pitch. Must be positive.
    pub step: f64,
    /// Feed rate for linear moves, mm/min.
    pub feed_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangefinderConfig {
    /// Advertised device name the transport should attach to.
    pub device_name: String,
    /// GATT service carrying the command characteristic.
    pub service_uuid: String,
    /// Characteristic used for both writes and notifications.
    pub characteristic_uuid: String,
    /// Deadline for a command's notification, in seconds.
    pub response_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Base URL of the stage's HTTP command API.
    pub base_url: String,
    /// Shared secret presented at session handshake.
    pub token: String,
    /// Liveness poll interval while the session is open, in seconds.
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Destination for the sample table.
    pub table_path: PathBuf,
    /// Destination for the triangulated surface.
    pub mesh_path: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ReliefConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            rangefinder: RangefinderConfig::default(),
            stage: StageConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            x_min: 100.0,
            x_max: 140.0,
            y_min: 100.0,
            y_max: 140.0,
            step: 10.0,
            feed_rate: 1500.0,
        }
    }
}

impl Default for RangefinderConfig {
    fn default() -> Self {
        Self {
            device_name: "Bosch PLR40C".to_string(),
            service_uuid: "00005301-0000-0041-5253-534f46540000".to_string(),
            characteristic_uuid: "00004301-0000-0041-5253-534f46540000".to_string(),
            response_timeout_secs: 30,
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.10.83:8080/api/v1".to_string(),
            token: String::new(),
            keep_alive_secs: 1,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from("relief.xlsx"),
            mesh_path: PathBuf::from("relief.stl"),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_or_tmp().join(".config"))
        .join("relief")
}

fn home_or_tmp() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ReliefConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            ReliefConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("RELIEF_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&ReliefConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply RELIEF_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RELIEF_STAGE__BASE_URL") {
            self.stage.base_url = v;
        }
        if let Ok(v) = std::env::var("RELIEF_STAGE__TOKEN") {
            self.stage.token = v;
        }
        if let Ok(v) = std::env::var("RELIEF_RANGEFINDER__DEVICE_NAME") {
            self.rangefinder.device_name = v;
        }
        if let Ok(v) = std::env::var("RELIEF_SCAN__STEP") {
            if let Ok(step) = v.parse() {
                self.scan.step = step;
            }
        }
        if let Ok(v) = std::env::var("RELIEF_SCAN__FEED_RATE") {
            if let Ok(feed) = v.parse() {
                self.scan.feed_rate = feed;
            }
        }
    }
}
