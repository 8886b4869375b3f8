use std::path::{Path, PathBuf};

use log::error;
use serde::{Deserialize, Serialize};

use crate::TridashError;
use crate::i18n::Locale;

pub const APP_DIR_NAME: &str = "tridash";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_OFFSET_MINUTES: u32 = 10;
pub const DEFAULT_EXPORT_DELAY_MS: u64 = 1000;
pub const DEFAULT_EXPORT_SPLIT_DAYS: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub locale: Locale,
    /// Padding around the race window on the feedback chart
    pub default_offset_minutes: u32,
    pub page_size: u32,
    /// Pause between the requests of a split export
    pub export_delay_ms: u64,
    pub export_split_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            locale: Locale::default(),
            default_offset_minutes: DEFAULT_OFFSET_MINUTES,
            page_size: crate::filters::DEFAULT_PAGE_SIZE,
            export_delay_ms: DEFAULT_EXPORT_DELAY_MS,
            export_split_days: DEFAULT_EXPORT_SPLIT_DAYS,
        }
    }
}

/// Directory holding the config file, the session token and the export history.
pub fn app_config_dir() -> Result<PathBuf, TridashError> {
    Ok(dirs::config_dir()
        .ok_or(TridashError::NoConfigDir)?
        .join(APP_DIR_NAME))
}

impl AppConfig {
    pub fn from_local_file() -> Option<Self> {
        let config_path = app_config_dir().ok()?.join(CONFIG_FILE_NAME);
        match Self::from_path(&config_path) {
            Ok(config) => config,
            Err(e) => {
                error!("Could not read config file {:?}: {}", config_path, e);
                None
            }
        }
    }

    pub fn from_path(config_path: &Path) -> Result<Option<Self>, TridashError> {
        if !config_path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(config_path)
            .map_err(|e| TridashError::ConfigIOError { source: e })?;
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| TridashError::ConfigSerializeError { source: e })
    }

    pub fn save(&self) -> Result<(), TridashError> {
        self.save_to(&app_config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), TridashError> {
        if let Some(parent) = config_path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| TridashError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| TridashError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| TridashError::ConfigSerializeError { source: e })
    }

    /// API base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
