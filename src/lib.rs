//! r-playbot library core functionality

pub mod commands;
pub mod config;
pub mod coordinator;
pub mod download;
pub mod engine;
pub mod executor;
pub mod history;
pub mod provider;
pub mod transport;
pub mod ui;

use std::sync::{Mutex, MutexGuard};

/// Locks `mutex`, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Initialize the application directories
pub fn init_app_dirs(settings: &config::Settings) -> std::io::Result<()> {
    let default_path = config::Settings::default_path();
    let dirs = [
        default_path.parent(),
        Some(settings.download_dir.as_path()),
        Some(settings.share_dir.as_path()),
    ];
    for dir in dirs.into_iter().flatten() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}
