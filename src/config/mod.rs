pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_settings, load_settings_from_process_env};
pub use paths::{default_config_path, expand_home, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE_NAME};
pub use settings::{
    AgentSettings, ApiSettings, GitSettings, LoggingSettings, RecoverySettings, Settings,
    StoreSettings, API_URL_ENV, DATABASE_PATH_ENV, LOG_LEVEL_ENV, LOG_PATH_ENV,
    MAIN_REPO_PATH_ENV,
};
