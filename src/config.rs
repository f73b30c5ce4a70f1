//! Host configuration
//!
//! Read from a JSON file; every member has a default so a partial (or absent)
//! file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult, Locale};

/// Which persistence backend the host opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// JSON documents in `data_dir`, one per storage key
    #[default]
    Local,
    /// `forms.db` in `data_dir`
    Sqlite,
}

/// How often the log file rolls over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// One `nps-forms.log`
    Never,
    Hourly,
    #[default]
    Daily,
}

impl LogRotation {
    fn to_rotation(self) -> rolling_logger::Rotation {
        match self {
            LogRotation::Never => rolling_logger::Rotation::NEVER,
            LogRotation::Hourly => rolling_logger::Rotation::HOURLY,
            LogRotation::Daily => rolling_logger::Rotation::DAILY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub data_dir: PathBuf,
    /// Key prefix for the local backend
    pub namespace: String,
    pub locale: Locale,
    /// Defaults to `<data_dir>/logs`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    pub log_rotation: LogRotation,
    /// Log files kept on disk, the current one included
    pub log_keep_files: usize,
    pub log_buffer_lines: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            data_dir: PathBuf::from("nps-data"),
            namespace: "nps".to_string(),
            locale: Locale::En,
            log_dir: None,
            log_rotation: LogRotation::Daily,
            log_keep_files: rolling_logger::DEFAULT_KEEP_FILES,
            log_buffer_lines: rolling_logger::DEFAULT_BUFFER_LINES,
        }
    }
}

impl AppConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> DomainResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(DomainError::Internal(format!(
                    "Failed to read config {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&text).map_err(|e| {
            DomainError::InvalidInput(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("logs"))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("forms.db")
    }

    pub fn logger_options(&self) -> rolling_logger::LoggerOptions {
        rolling_logger::LoggerOptions {
            rotation: self.log_rotation.to_rotation(),
            keep_files: self.log_keep_files,
            buffer_lines: self.log_buffer_lines,
            ..rolling_logger::LoggerOptions::default()
        }
    }
}
