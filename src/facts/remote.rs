use super::{
    FactSource, FactSourceError, PhaseSnapshot, SourceKind, ValidatedResultSnapshot,
    WorkflowSelector, WorkflowSnapshot,
};
use crate::domain::WorkflowStatus;
use crate::shared::ExternalError;
use serde::Deserialize;
use std::time::Duration;

const OPERATION: &str = "fetch_workflow_status";
const INACTIVE: &str = "inactive";

/// Client for the service's `GET /api/workflow` aggregate.
#[derive(Debug, Clone)]
pub struct RemoteStatusClient {
    api_base: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct WorkflowPayload {
    status: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    validated_result: Option<ValidatedResultSnapshot>,
    #[serde(default)]
    phases: Vec<PhaseSnapshot>,
}

impl RemoteStatusClient {
    pub fn new(api_base: &str, timeout: Duration) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn endpoint(&self, selector: &WorkflowSelector) -> String {
        match selector.workflow_id() {
            Some(id) => format!(
                "{}/api/workflow?workflow_id={}",
                self.api_base,
                urlencoding::encode(id.as_str())
            ),
            None => format!("{}/api/workflow", self.api_base),
        }
    }

    fn fetch(&self, url: &str) -> Result<String, ExternalError> {
        let response = self.agent.get(url).call().map_err(|err| match err {
            ureq::Error::Status(code, _) if code >= 500 => {
                ExternalError::transient(OPERATION, format!("HTTP {code}"))
            }
            ureq::Error::Status(code, _) => {
                ExternalError::rejected(OPERATION, format!("HTTP {code}"))
            }
            ureq::Error::Transport(transport) => {
                ExternalError::transient(OPERATION, transport.to_string())
            }
        })?;
        response
            .into_string()
            .map_err(|err| ExternalError::transient(OPERATION, err.to_string()))
    }
}

/// Decodes the endpoint body. `inactive` means no workflow is running.
pub(crate) fn parse_workflow_payload(
    body: &str,
) -> Result<Option<WorkflowSnapshot>, FactSourceError> {
    let malformed = |reason: String| FactSourceError::Malformed {
        source_name: SourceKind::Api.as_str().to_string(),
        reason,
    };
    let payload: WorkflowPayload =
        serde_json::from_str(body).map_err(|err| malformed(err.to_string()))?;
    if payload.status.trim().eq_ignore_ascii_case(INACTIVE) {
        return Ok(None);
    }
    let status = WorkflowStatus::parse(&payload.status).map_err(malformed)?;

    Ok(Some(WorkflowSnapshot {
        workflow_id: payload.id,
        workflow_name: payload.name,
        status,
        validated_result: payload.validated_result,
        phases: payload.phases,
    }))
}

impl FactSource for RemoteStatusClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn load_snapshot(
        &self,
        selector: &WorkflowSelector,
    ) -> Result<Option<WorkflowSnapshot>, FactSourceError> {
        let body = self.fetch(&self.endpoint(selector))?;
        parse_workflow_payload(&body)
    }
}
