//! Configuration file support for voxview.
//!
//! User preferences (endpoint, cache budget, zoom limits, playback speed and
//! log level) are stored as versioned JSON in the platform config directory.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BASE_URL, DEFAULT_CACHE_SIZE, DEFAULT_PRELOAD_COUNT};
use crate::playback::PlaybackSpeed;
use crate::viewport::ViewportOptions;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Slice cache section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of decoded slices kept in memory
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Number of slices to preload before/after the current one
    #[serde(default = "default_preload_count")]
    pub preload_count: usize,
}

fn default_max_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_preload_count() -> usize {
    DEFAULT_PRELOAD_COUNT
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            preload_count: default_preload_count(),
        }
    }
}

/// Viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Base URL of the viewer API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub viewport: ViewportOptions,

    #[serde(default)]
    pub playback_speed: PlaybackSpeed,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl ViewerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            base_url: default_base_url(),
            cache: CacheConfig::default(),
            viewport: ViewportOptions::default(),
            playback_speed: PlaybackSpeed::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "voxview-config.json"
    }

    /// Default config file path, `None` if no config or home directory exists.
    pub fn default_path() -> Option<std::path::PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("voxview").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("voxview")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from `path`.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let mut config = ViewerConfig::new();
        config.base_url = "http://scanner:8080".to_string();
        config.cache.max_size = 12;
        config.playback_speed = PlaybackSpeed::Fast;
        config.log_level = LogLevel::Debug;

        let json = config.to_json().unwrap();
        let loaded = ViewerConfig::from_json(&json).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = ViewerConfig::from_json(r#"{"version": 1}"#).unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.cache.max_size, 50);
        assert_eq!(config.cache.preload_count, 3);
        assert_eq!(config.viewport.zoom_speed, 0.25);
        assert_eq!(config.playback_speed.millis(), 200);
    }

    #[test]
    fn test_partial_viewport_section() {
        let config =
            ViewerConfig::from_json(r#"{"version": 1, "viewport": {"max_zoom": 4.0}}"#).unwrap();
        assert_eq!(config.viewport.max_zoom, 4.0);
        assert_eq!(config.viewport.min_zoom, 0.5);
    }

    #[test]
    fn test_version_too_new() {
        let json = format!(r#"{{"version": {}}}"#, CONFIG_VERSION + 1);
        let result = ViewerConfig::from_json(&json);
        assert!(matches!(result, Err(ConfigError::VersionTooNew { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let result = ViewerConfig::from_json("not valid json");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
        assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
        let level: LogLevel = serde_json::from_str(r#""warn""#).unwrap();
        assert_eq!(level, LogLevel::Warn);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir()
            .join(format!("voxview-config-test-{}", std::process::id()))
            .join(ViewerConfig::default_filename());
        let config = ViewerConfig::new();
        config.save(&path).unwrap();
        assert_eq!(ViewerConfig::load(&path).unwrap(), config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
