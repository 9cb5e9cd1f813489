use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dependencies::APP_DIR_NAME;
use crate::models::DownloadForm;

const SETTINGS_FILE: &str = "settings.json";

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE))
}

/// Reads saved form preferences. A missing or unreadable file gives the
/// defaults.
pub fn load(path: &Path) -> DownloadForm {
    if !path.exists() {
        return DownloadForm::default();
    }
    match read(path) {
        Ok(form) => form,
        Err(e) => {
            warn!("ignoring settings at {}: {:#}", path.display(), e);
            DownloadForm::default()
        }
    }
}

fn read(path: &Path) -> Result<DownloadForm> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).context("invalid settings file")
}

pub fn save(path: &Path, form: &DownloadForm) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(form)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
