use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "PHASEKEEPER_CONFIG";
pub const DEFAULT_CONFIG_FILE_NAME: &str = "phasekeeper.yaml";

pub fn default_config_path() -> PathBuf {
    PathBuf::from(".").join(DEFAULT_CONFIG_FILE_NAME)
}

/// Expands a leading `~` using `home`; other paths are returned unchanged.
pub fn expand_home(path: &Path, home: Option<&str>) -> PathBuf {
    let Some(home) = home.filter(|h| !h.trim().is_empty()) else {
        return path.to_path_buf();
    };
    match path.strip_prefix("~") {
        Ok(rest) => PathBuf::from(home).join(rest),
        Err(_) => path.to_path_buf(),
    }
}
