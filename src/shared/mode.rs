use serde::Serialize;

/// Whether a batch only reports what it would do or also applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Report,
    Execute,
}

impl RunMode {
    pub fn from_execute_flag(execute: bool) -> Self {
        if execute {
            Self::Execute
        } else {
            Self::Report
        }
    }

    pub fn is_execute(self) -> bool {
        self == Self::Execute
    }
}
