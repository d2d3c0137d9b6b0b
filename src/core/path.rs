use crate::core::{MergeError, MergeResult};
use std::path::PathBuf;

// Re-export all path functions from apkmerge-core
pub use apkmerge_core::core::path::*;

/// Get the apkmerge config directory
///
/// Platform-specific locations:
/// - Windows: %APPDATA%\apkmerge
/// - Linux: ~/.config/apkmerge
/// - macOS: ~/Library/Application Support/apkmerge
pub fn apkmerge_home() -> MergeResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| MergeError::Config("Could not determine config directory".to_string()))?;
    Ok(config_dir.join("apkmerge"))
}

/// Get the config file path (`<config dir>/apkmerge/config.yaml`)
pub fn config_file() -> MergeResult<PathBuf> {
    Ok(apkmerge_home()?.join("config.yaml"))
}
