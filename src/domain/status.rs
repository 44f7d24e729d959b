use serde::{Deserialize, Serialize};

macro_rules! status_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            pub fn parse(raw: &str) -> Result<Self, String> {
                match raw.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        "unknown {} `{}`; expected one of: {}",
                        $kind,
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum!(WorkflowStatus, "workflow status", {
    Active => "active",
    Paused => "paused",
    Completed => "completed",
});

status_enum!(TaskStatus, "task status", {
    Pending => "pending",
    Queued => "queued",
    Assigned => "assigned",
    InProgress => "in_progress",
    Done => "done",
    Failed => "failed",
    Blocked => "blocked",
});

status_enum!(AgentStatus, "agent status", {
    Idle => "idle",
    Working => "working",
    Running => "running",
    Stuck => "stuck",
    Terminated => "terminated",
});

status_enum!(MergeStatus, "merge status", {
    Active => "active",
    Merged => "merged",
    Cleaned => "cleaned",
    Abandoned => "abandoned",
});

status_enum!(ResultStatus, "workflow result status", {
    Pending => "pending",
    Validated => "validated",
    Rejected => "rejected",
});

/// Rollup bucket a task status contributes to, besides `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskBucket {
    Completed,
    Active,
    Pending,
    /// Counted in `total` only: `queued`, `failed` and `blocked`.
    Uncounted,
}

impl TaskStatus {
    pub fn bucket(self) -> TaskBucket {
        match self {
            Self::Done => TaskBucket::Completed,
            Self::Assigned | Self::InProgress => TaskBucket::Active,
            Self::Pending => TaskBucket::Pending,
            Self::Queued | Self::Failed | Self::Blocked => TaskBucket::Uncounted,
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }
}

impl WorkflowStatus {
    /// Statuses eligible for implicit workflow selection.
    pub const SELECTABLE: &'static [Self] = &[Self::Active, Self::Paused];
}

impl AgentStatus {
    /// Agents a stalled-agent restart acts on.
    pub const STALLED: &'static [Self] = &[Self::Working, Self::Running, Self::Stuck];

    pub fn is_live(self) -> bool {
        Self::STALLED.contains(&self)
    }
}
