use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ExportFormat;
use crate::TridashError;
use crate::config::app_config_dir;

pub const MAX_HISTORY_ENTRIES: usize = 50;
const HISTORY_FILE_NAME: &str = "export_history.jsonl";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExportRecord {
    pub file_name: String,
    pub path: PathBuf,
    pub format: ExportFormat,
    #[serde(with = "crate::timestamp::required")]
    pub exported_at: DateTime<Utc>,
    pub rows: Option<u64>,
}

/// Recently exported files, newest first, one JSON line per entry on disk.
pub struct ExportHistory {
    path: PathBuf,
    entries: VecDeque<ExportRecord>,
}

impl ExportHistory {
    pub fn load(path: &Path) -> Result<Self, TridashError> {
        let mut entries = VecDeque::new();
        if path.exists() {
            let saved = serde_jsonlines::json_lines(path)
                .map_err(|e| TridashError::ConfigIOError { source: e })?
                .collect::<Result<Vec<ExportRecord>, std::io::Error>>()
                .map_err(|e| TridashError::ConfigIOError { source: e })?;
            entries.extend(saved.into_iter().take(MAX_HISTORY_ENTRIES));
        }
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn load_default() -> Result<Self, TridashError> {
        Self::load(&app_config_dir()?.join(HISTORY_FILE_NAME))
    }

    pub fn entries(&self) -> impl Iterator<Item = &ExportRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds a record in front, dropping the oldest beyond the cap.
    pub fn push(&mut self, record: ExportRecord) {
        self.entries.push_front(record);
        self.entries.truncate(MAX_HISTORY_ENTRIES);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn save(&self) -> Result<(), TridashError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TridashError::ConfigIOError { source: e })?;
        }
        serde_jsonlines::write_json_lines(&self.path, &self.entries)
            .map_err(|e| TridashError::ConfigIOError { source: e })
    }
}
