use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub fn validate_identifier_value(kind: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{kind} must be non-empty"));
    }
    if value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
    {
        return Ok(());
    }
    Err(format!(
        "{kind} must use only ASCII letters, digits, '-', '_' or '.'"
    ))
}

macro_rules! define_id_type {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> Result<Self, String> {
                validate_identifier_value($kind, raw)?;
                Ok(Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Leading eight characters, enough to tell records apart in logs.
            pub fn short(&self) -> &str {
                let end = self
                    .0
                    .char_indices()
                    .nth(8)
                    .map(|(idx, _)| idx)
                    .unwrap_or(self.0.len());
                &self.0[..end]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(|err| {
                    D::Error::custom(format!("invalid {} `{}`: {}", $kind, raw, err))
                })
            }
        }
    };
}

define_id_type!(WorkflowId, "workflow id");
define_id_type!(PhaseId, "phase id");
define_id_type!(TaskId, "task id");
define_id_type!(AgentId, "agent id");
define_id_type!(WorktreeId, "worktree id");
define_id_type!(ResultId, "workflow result id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_shaped_ids_parse() {
        let id = TaskId::parse("3f2b9c1e-7a4d-4e21-9b8f-0c1d2e3f4a5b").expect("parse");
        assert_eq!(id.short(), "3f2b9c1e");
    }

    #[test]
    fn short_id_is_whole_value_when_short() {
        let id = AgentId::parse("a-7").expect("parse");
        assert_eq!(id.short(), "a-7");
    }

    #[test]
    fn ids_reject_whitespace_and_empty() {
        assert!(WorkflowId::parse("").is_err());
        assert!(PhaseId::parse("phase 1").is_err());
    }

    #[test]
    fn ids_deserialize_with_validation() {
        let ok: WorktreeId = serde_json::from_str("\"wt-7\"").expect("valid id");
        assert_eq!(ok.as_str(), "wt-7");
        let err = serde_json::from_str::<ResultId>("\"bad id\"").expect_err("invalid id");
        assert!(err.to_string().contains("invalid workflow result id"));
    }
}
