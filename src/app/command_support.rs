use crate::config::{load_settings_from_process_env, Settings};
use crate::facts::{FactSource, RemoteStatusClient, StoreFactSource};
use crate::report::ReconciliationReport;
use crate::shared::{EngineLog, WorkflowId};
use crate::store::SqliteStore;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMethod {
    Api,
    Db,
    #[default]
    Both,
}

impl SourceMethod {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "db" => Ok(Self::Db),
            "both" => Ok(Self::Both),
            other => Err(format!("--method must be one of: api, db, both (got `{other}`)")),
        }
    }

    pub fn uses_api(self) -> bool {
        matches!(self, Self::Api | Self::Both)
    }

    pub fn uses_db(self) -> bool {
        matches!(self, Self::Db | Self::Both)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    pub config: Option<PathBuf>,
    pub workflow_id: Option<WorkflowId>,
    pub method: SourceMethod,
    pub execute: bool,
    pub json: bool,
    pub check_blocked: bool,
}

fn option_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("missing value for {flag}"))
}

/// Parses `args`, rejecting any flag not listed in `allowed`.
pub fn parse_options(args: &[String], allowed: &[&str]) -> Result<CommandOptions, String> {
    let mut options = CommandOptions::default();
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        if !allowed.contains(&flag) {
            return Err(format!("unknown option `{flag}`"));
        }
        match flag {
            "--config" => {
                options.config = Some(PathBuf::from(option_value(args, i, flag)?));
                i += 2;
            }
            "--workflow-id" => {
                options.workflow_id = Some(WorkflowId::parse(option_value(args, i, flag)?)?);
                i += 2;
            }
            "--method" => {
                options.method = SourceMethod::parse(option_value(args, i, flag)?)?;
                i += 2;
            }
            "--execute" => {
                options.execute = true;
                i += 1;
            }
            "--json" => {
                options.json = true;
                i += 1;
            }
            "--check-blocked" => {
                options.check_blocked = true;
                i += 1;
            }
            other => return Err(format!("unknown option `{other}`")),
        }
    }
    Ok(options)
}

/// Settings and log shared by one command invocation.
pub struct CommandContext {
    pub settings: Settings,
    pub log: EngineLog,
}

impl CommandContext {
    pub fn load(options: &CommandOptions) -> Result<Self, String> {
        let settings =
            load_settings_from_process_env(options.config.as_deref()).map_err(|e| e.to_string())?;
        let log = settings.engine_log();
        Ok(Self { settings, log })
    }

    pub fn open_store(&self) -> Result<SqliteStore, String> {
        let path = self
            .settings
            .require_database()
            .map_err(|e| e.to_string())?;
        SqliteStore::open(path).map_err(|e| e.to_string())
    }
}

/// Fact sources selected by `--method`, API first.
pub struct SelectedSources {
    api: Option<RemoteStatusClient>,
    store: Option<StoreFactSource>,
}

impl SelectedSources {
    pub fn open(context: &CommandContext, method: SourceMethod) -> Result<Self, String> {
        let api = method.uses_api().then(|| {
            RemoteStatusClient::new(
                &context.settings.api.base_url,
                context.settings.status_timeout(),
            )
        });
        let store = if method.uses_db() {
            Some(StoreFactSource::new(context.open_store()?))
        } else {
            None
        };
        Ok(Self { api, store })
    }

    pub fn as_sources(&self) -> Vec<&dyn FactSource> {
        let mut sources: Vec<&dyn FactSource> = Vec::new();
        if let Some(api) = &self.api {
            sources.push(api);
        }
        if let Some(store) = &self.store {
            sources.push(store);
        }
        sources
    }
}

pub fn new_report() -> Result<ReconciliationReport, String> {
    ReconciliationReport::new().map_err(|e| e.to_string())
}

pub fn to_json(report: &ReconciliationReport) -> Result<String, String> {
    serde_json::to_string_pretty(report).map_err(|e| format!("failed to encode report: {e}"))
}
