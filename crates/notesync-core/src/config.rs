//! Configuration module for NoteSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{DownloadOptions, FileSortMode};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for NoteSync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub network: NetworkConfig,
    pub downloads: DownloadsConfig,
    pub schedule: ScheduleConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Local store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the local store (`pdfs/`, `sources/`, `tmp/`, `targets.json`).
    pub base_dir: PathBuf,
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// User-Agent sent with every request.
    pub user_agent: String,
}

/// Folder download policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    pub skip_video_files: bool,
    pub skip_large_files: bool,
    /// Threshold for `skip_large_files`, in MiB.
    pub max_file_size_mb: u64,
}

/// Auto-sync settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Whether `notesync watch` should sync at all.
    pub auto_sync: bool,
    /// Minutes between automatic runs.
    pub check_interval_minutes: u64,
}

/// Presentation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Order of a folder target's files: `name` or `date`.
    pub file_sort_mode: FileSortMode,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create configuration directory")?;
        }
        let yaml = serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        std::fs::write(path, yaml).context("Failed to write configuration file")?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/notesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("notesync")
            .join("config.yaml")
    }

    /// Download policy for one sync run.
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            skip_video_files: self.downloads.skip_video_files,
            skip_large_files: self.downloads.skip_large_files,
            max_file_size_bytes: self
                .downloads
                .max_file_size_mb
                .max(MIN_FILE_SIZE_MB)
                .saturating_mul(1024 * 1024),
        }
    }

    /// Auto-sync interval, clamped to the allowed minimum.
    pub fn check_interval(&self) -> std::time::Duration {
        let minutes = self
            .schedule
            .check_interval_minutes
            .max(MIN_CHECK_INTERVAL_MINUTES);
        std::time::Duration::from_secs(minutes.saturating_mul(60))
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join(".notes-sync-app-linux"),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            user_agent: "NotesSyncLinux/1.0".to_string(),
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            skip_video_files: false,
            skip_large_files: false,
            max_file_size_mb: 100,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            auto_sync: false,
            check_interval_minutes: 180,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"schedule.check_interval_minutes"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Smallest accepted `schedule.check_interval_minutes`.
pub const MIN_CHECK_INTERVAL_MINUTES: u64 = 5;

/// Smallest accepted `downloads.max_file_size_mb`.
pub const MIN_FILE_SIZE_MB: u64 = 1;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.storage.base_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.base_dir".into(),
                message: "must not be empty".into(),
            });
        }

        if self.network.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "network.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.network.user_agent.trim().is_empty() {
            errors.push(ValidationError {
                field: "network.user_agent".into(),
                message: "must not be empty".into(),
            });
        }

        if self.downloads.max_file_size_mb < MIN_FILE_SIZE_MB {
            errors.push(ValidationError {
                field: "downloads.max_file_size_mb".into(),
                message: format!("must be at least {MIN_FILE_SIZE_MB}"),
            });
        }

        if self.schedule.check_interval_minutes < MIN_CHECK_INTERVAL_MINUTES {
            errors.push(ValidationError {
                field: "schedule.check_interval_minutes".into(),
                message: format!("must be at least {MIN_CHECK_INTERVAL_MINUTES}"),
            });
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn base_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.base_dir = dir;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.network.timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.network.user_agent = agent.into();
        self
    }

    pub fn skip_video_files(mut self, skip: bool) -> Self {
        self.config.downloads.skip_video_files = skip;
        self
    }

    pub fn skip_large_files(mut self, skip: bool) -> Self {
        self.config.downloads.skip_large_files = skip;
        self
    }

    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        self.config.downloads.max_file_size_mb = mb;
        self
    }

    pub fn auto_sync(mut self, enabled: bool) -> Self {
        self.config.schedule.auto_sync = enabled;
        self
    }

    pub fn check_interval_minutes(mut self, minutes: u64) -> Self {
        self.config.schedule.check_interval_minutes = minutes;
        self
    }

    pub fn file_sort_mode(mut self, mode: FileSortMode) -> Self {
        self.config.display.file_sort_mode = mode;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder without validating.
    pub fn build(self) -> Config {
        self.config
    }

    /// Consume the builder, returning every validation error on failure.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
