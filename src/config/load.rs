use super::paths::{default_config_path, CONFIG_PATH_ENV};
use super::{ConfigError, Settings};
use std::path::{Path, PathBuf};

/// Resolves settings from `explicit`, else `PHASEKEEPER_CONFIG`, else
/// `./phasekeeper.yaml`. Only the implicit default may be absent, in which
/// case built-in defaults apply.
pub fn load_settings<F>(explicit: Option<&Path>, env: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let configured = explicit.map(Path::to_path_buf).or_else(|| {
        env(CONFIG_PATH_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    });

    let mut settings = match configured {
        Some(path) => Settings::from_path(&path)?,
        None => {
            let path = default_config_path();
            if path.exists() {
                Settings::from_path(&path)?
            } else {
                Settings::default()
            }
        }
    };
    settings.apply_env_overrides(&env)?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_settings_from_process_env(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    load_settings(explicit, |key| std::env::var(key).ok())
}
