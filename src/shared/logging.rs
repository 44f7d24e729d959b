use super::time::now_secs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err("log level must be one of: debug, info, warn, error".to_string()),
        }
    }
}

/// JSON-lines event log. A log without a path discards every event.
#[derive(Debug, Clone, Default)]
pub struct EngineLog {
    path: Option<PathBuf>,
    min_level: LogLevel,
}

impl EngineLog {
    pub fn new(path: Option<PathBuf>, min_level: LogLevel) -> Self {
        Self { path, min_level }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn debug(&self, event: &str, fields: &[(&str, Value)]) {
        self.append(LogLevel::Debug, event, fields);
    }

    pub fn info(&self, event: &str, fields: &[(&str, Value)]) {
        self.append(LogLevel::Info, event, fields);
    }

    pub fn warn(&self, event: &str, fields: &[(&str, Value)]) {
        self.append(LogLevel::Warn, event, fields);
    }

    pub fn append(&self, level: LogLevel, event: &str, fields: &[(&str, Value)]) {
        if level < self.min_level {
            return;
        }
        let Some(path) = &self.path else {
            return;
        };
        let _ = append_event_line(path, level, event, fields);
    }
}

fn append_event_line(
    path: &Path,
    level: LogLevel,
    event: &str,
    fields: &[(&str, Value)],
) -> std::io::Result<()> {
    let mut payload = Map::new();
    payload.insert("timestamp".to_string(), Value::from(now_secs()));
    payload.insert(
        "level".to_string(),
        Value::String(level.as_str().to_string()),
    );
    payload.insert("event".to_string(), Value::String(event.to_string()));
    for (key, value) in fields {
        payload.insert((*key).to_string(), value.clone());
    }
    let line = serde_json::to_string(&payload).map_err(std::io::Error::other)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")
}
