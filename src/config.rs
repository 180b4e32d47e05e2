use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::CoordinatorSettings;
use crate::domain::AppError;

pub const APP_NAME: &str = "image-downloader";

/// Global configuration loaded from `~/.config/image-downloader/config.toml`.
/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Download root; `$HOME/Downloads` when unset.
    pub download_dir: Option<PathBuf>,
    /// Sub-directory of the download root that receives the images.
    pub download_subdir: String,
    /// Lifetime of the blob URL used for inline images, in milliseconds.
    pub blob_release_delay_ms: u64,
    /// How long a finished status stays visible before the idle text returns.
    pub status_revert_ms: u64,
    /// Number of recent downloads listed in the status window.
    pub recent_display: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            download_subdir: "Image_Downloader".to_string(),
            blob_release_delay_ms: 10_000,
            status_revert_ms: 3_000,
            recent_display: 3,
        }
    }
}

fn xdg_dirs() -> Result<xdg::BaseDirectories, AppError> {
    xdg::BaseDirectories::with_prefix(APP_NAME).map_err(|e| AppError::Config(e.to_string()))
}

pub fn config_path() -> Result<PathBuf, AppError> {
    xdg_dirs()?
        .place_config_file("config.toml")
        .map_err(|e| AppError::Io(e.to_string()))
}

/// JSON file backing the `recentDownloads` history.
pub fn storage_path() -> Result<PathBuf, AppError> {
    xdg_dirs()?
        .place_data_file("storage.json")
        .map_err(|e| AppError::Io(e.to_string()))
}

impl AppConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(&config_path()?)
    }

    /// Missing file means defaults; a file that does not parse is an error.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| AppError::Io(e.to_string()))?;
        toml::from_str(&raw).map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join("Downloads")))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            download_subdir: self.download_subdir.clone(),
            blob_release_delay: Duration::from_millis(self.blob_release_delay_ms),
        }
    }

    pub fn status_revert(&self) -> Duration {
        Duration::from_millis(self.status_revert_ms)
    }
}
