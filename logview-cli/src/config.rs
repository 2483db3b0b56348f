//! Configuration lookup for logview.

use anyhow::{Context, Result};
use logview_engine::EngineConfig;
use std::path::{Path, PathBuf};

/// File name looked up in the platform config directory.
pub const CONFIG_FILE: &str = "engine.toml";

/// Default location of the engine configuration, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "logview", "logview")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Load the engine configuration.
///
/// An explicit path must exist. Without one, the default location is used
/// when present, otherwise built-in defaults. Returns the file the
/// configuration came from, if any.
pub fn load(explicit: Option<&Path>) -> Result<(EngineConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return load_from(path).map(|config| (config, Some(path.to_path_buf())));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            let config = load_from(&path)?;
            Ok((config, Some(path)))
        }
        _ => Ok((EngineConfig::default(), None)),
    }
}

fn load_from(path: &Path) -> Result<EngineConfig> {
    EngineConfig::from_file(path)
        .with_context(|| format!("Failed to load engine configuration from {}", path.display()))
}
