//! # Data Directory and Startup
//!
//! All persisted state lives in one directory:
//!
//! 1. `data_override` (the CLI's `--data`), when given.
//! 2. `URBANWATCH_DATA`, when set. Mostly used to isolate tests.
//! 3. The OS data directory from [`directories::ProjectDirs`].
//!
//! The same directory holds `urbanwatch.toml`. A broken config file is not
//! fatal at startup: the error is logged and compiled defaults are used, so the
//! user can still list and export their reports.

use crate::api::UrbanApi;
use crate::config::AppConfig;
use crate::error::{Result, UrbanError};
use crate::store::fs_backend::FsBackend;
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const DATA_DIR_ENV: &str = "URBANWATCH_DATA";

pub struct UrbanContext {
    pub api: UrbanApi<FsBackend>,
    pub data_dir: PathBuf,
}

pub fn resolve_data_dir(data_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = data_override {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    ProjectDirs::from("org", "urbanwatch", "urbanwatch")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| UrbanError::Config("could not determine a data directory".to_string()))
}

/// Resolves the data directory, loads configuration and opens the filesystem store.
pub fn initialize(data_override: Option<PathBuf>) -> Result<UrbanContext> {
    let data_dir = resolve_data_dir(data_override)?;
    let config = AppConfig::load_from_dir(&data_dir).unwrap_or_else(|e| {
        warn!(error = %e, "invalid configuration, using defaults");
        AppConfig::default()
    });
    debug!(data_dir = %data_dir.display(), "initialized");

    let api = UrbanApi::new(FsBackend::new(data_dir.clone()), config);
    Ok(UrbanContext { api, data_dir })
}
