//! Platform-specific utilities for cross-platform support

use std::path::PathBuf;

const APP_DIR: &str = "AutoLot";

/// Get the platform-specific data directory for storing application data
///
/// Returns:
/// - Windows: %LOCALAPPDATA%\AutoLot
/// - macOS: ~/Library/Application Support/AutoLot
/// - Linux/Other: ~/.local/share/AutoLot
pub fn get_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".data")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(APP_DIR)
}

/// Get the platform-specific config directory
pub fn get_config_dir() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(APP_DIR)
}

/// Directory holding the local mirror of the inventory
pub fn get_default_mirror_dir() -> PathBuf {
    get_data_dir()
}

/// Get the default configuration file path
pub fn get_default_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

/// Ensure the data directory exists
pub fn ensure_data_dir() -> std::io::Result<PathBuf> {
    let dir = get_data_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
