use crate::shared::{AgentId, ExternalError, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const TERMINATE: &str = "terminate_agent";
const RESTART: &str = "restart_task";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestartOutcome {
    Accepted { new_agent_id: Option<String> },
    /// The task is not eligible for restart; retrying will not help.
    Rejected { reason: String },
}

/// Agent process manager operations used by stalled-agent recovery.
pub trait ControlPlane: Sync {
    fn terminate(&self, agent_id: &AgentId, reason: &str) -> Result<(), ExternalError>;
    fn restart_task(&self, task_id: &TaskId) -> Result<RestartOutcome, ExternalError>;
}

/// Control plane reached over the service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    api_base: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct RestartResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

enum Failure {
    Status(u16, String),
    External(ExternalError),
}

impl HttpControlPlane {
    pub fn new(api_base: &str, timeout: Duration) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.api_base)
    }

    fn post(&self, operation: &str, body: Value) -> Result<ureq::Response, Failure> {
        self.agent
            .post(&self.endpoint(operation))
            .send_json(body)
            .map_err(|err| match err {
                ureq::Error::Status(code, response) => {
                    Failure::Status(code, error_detail(response))
                }
                ureq::Error::Transport(transport) => {
                    Failure::External(ExternalError::transient(operation, transport.to_string()))
                }
            })
    }
}

/// `detail` from a JSON error body, else the raw body text.
fn error_detail(response: ureq::Response) -> String {
    let text = response.into_string().unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|value| value.get("detail").cloned())
        .map(|detail| match detail {
            Value::String(text) => text,
            other => other.to_string(),
        });
    detail.unwrap_or_else(|| text.trim().to_string())
}

fn status_error(operation: &str, code: u16, detail: String) -> ExternalError {
    let reason = format!("HTTP {code}: {detail}");
    if code >= 500 {
        ExternalError::transient(operation, reason)
    } else {
        ExternalError::rejected(operation, reason)
    }
}

impl ControlPlane for HttpControlPlane {
    fn terminate(&self, agent_id: &AgentId, reason: &str) -> Result<(), ExternalError> {
        match self.post(
            TERMINATE,
            json!({ "agent_id": agent_id.as_str(), "reason": reason }),
        ) {
            Ok(_) => Ok(()),
            Err(Failure::Status(code, detail)) => Err(status_error(TERMINATE, code, detail)),
            Err(Failure::External(err)) => Err(err),
        }
    }

    fn restart_task(&self, task_id: &TaskId) -> Result<RestartOutcome, ExternalError> {
        let response = match self.post(RESTART, json!({ "task_id": task_id.as_str() })) {
            Ok(response) => response,
            Err(Failure::Status(code, detail)) if (400..500).contains(&code) => {
                return Ok(RestartOutcome::Rejected {
                    reason: format!("HTTP {code}: {detail}"),
                })
            }
            Err(Failure::Status(code, detail)) => return Err(status_error(RESTART, code, detail)),
            Err(Failure::External(err)) => return Err(err),
        };

        let body: RestartResponse = response
            .into_json()
            .map_err(|err| ExternalError::transient(RESTART, format!("invalid response: {err}")))?;
        if body.success {
            Ok(RestartOutcome::Accepted {
                new_agent_id: body.agent_id,
            })
        } else {
            Ok(RestartOutcome::Rejected {
                reason: body.message.unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }
}
