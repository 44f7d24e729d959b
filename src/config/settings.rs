use super::paths::expand_home;
use super::ConfigError;
use crate::shared::{EngineLog, LogLevel, DEFAULT_MAX_FANOUT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const MAIN_REPO_PATH_ENV: &str = "MAIN_REPO_PATH";
pub const API_URL_ENV: &str = "PHASEKEEPER_API_URL";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const LOG_PATH_ENV: &str = "PHASEKEEPER_LOG_PATH";

/// Immutable engine settings, resolved once from YAML plus environment
/// overrides and handed to each component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub api: ApiSettings,
    pub git: GitSettings,
    pub agents: AgentSettings,
    pub recovery: RecoverySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    pub database: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("./phasekeeper.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub status_timeout_secs: u64,
    pub control_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            status_timeout_secs: 5,
            control_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitSettings {
    pub main_repo_path: PathBuf,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            main_repo_path: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentSettings {
    pub termination_grace_secs: u64,
    pub restart_reason: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            termination_grace_secs: 2,
            restart_reason: "stalled agent restarted by phasekeeper".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoverySettings {
    pub max_fanout: usize,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            max_fanout: DEFAULT_MAX_FANOUT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub path: Option<PathBuf>,
    pub level: LogLevel,
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Applies environment overrides through `env`, so callers decide where
    /// variables come from. Blank values are ignored.
    pub fn apply_env_overrides<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        if let Some(value) = lookup(DATABASE_PATH_ENV) {
            self.store.database = PathBuf::from(value);
        }
        if let Some(value) = lookup(MAIN_REPO_PATH_ENV) {
            self.git.main_repo_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(API_URL_ENV) {
            self.api.base_url = value;
        }
        if let Some(value) = lookup(LOG_PATH_ENV) {
            self.logging.path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(LOG_LEVEL_ENV) {
            self.logging.level = LogLevel::parse(&value)
                .map_err(|err| ConfigError::Invalid(format!("`{LOG_LEVEL_ENV}`: {err}")))?;
        }

        let home = lookup("HOME");
        self.store.database = expand_home(&self.store.database, home.as_deref());
        self.git.main_repo_path = expand_home(&self.git.main_repo_path, home.as_deref());
        self.logging.path = self
            .logging
            .path
            .as_deref()
            .map(|path| expand_home(path, home.as_deref()));
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.database.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "`store.database` must not be empty".to_string(),
            ));
        }
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "`api.base_url` must start with http:// or https://, got `{base_url}`"
            )));
        }
        if self.api.status_timeout_secs == 0 || self.api.control_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "`api` timeouts must be greater than zero".to_string(),
            ));
        }
        if self.recovery.max_fanout == 0 {
            return Err(ConfigError::Invalid(
                "`recovery.max_fanout` must be greater than zero".to_string(),
            ));
        }
        if self.agents.restart_reason.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "`agents.restart_reason` must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Fails unless the configured database file already exists.
    pub fn require_database(&self) -> Result<&Path, ConfigError> {
        if !self.store.database.is_file() {
            return Err(ConfigError::MissingPath {
                what: "database",
                path: self.store.database.display().to_string(),
            });
        }
        Ok(&self.store.database)
    }

    pub fn require_repository(&self) -> Result<&Path, ConfigError> {
        if !self.git.main_repo_path.is_dir() {
            return Err(ConfigError::MissingPath {
                what: "repository",
                path: self.git.main_repo_path.display().to_string(),
            });
        }
        Ok(&self.git.main_repo_path)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.api.status_timeout_secs)
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_secs(self.api.control_timeout_secs)
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_secs(self.agents.termination_grace_secs)
    }

    pub fn engine_log(&self) -> EngineLog {
        EngineLog::new(self.logging.path.clone(), self.logging.level)
    }
}
