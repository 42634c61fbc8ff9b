//! Execution DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ContractViolation;
use crate::domain::execution::{Execution, ExecutionStatus};

/// Request to process one document through one pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitExecution {
    pub document_id: String,
    pub pipeline_id: String,
    #[serde(rename = "async")]
    pub run_async: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<HashMap<String, serde_json::Value>>,
}

/// Execution as returned by the service, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionPayload {
    #[serde(alias = "execution_id")]
    pub id: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub pipeline_id: Option<String>,
    pub pipeline_name: Option<String>,
    pub document_id: Option<String>,
    pub progress: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub result: Option<serde_json::Value>,
}

impl TryFrom<ExecutionPayload> for Execution {
    type Error = ContractViolation;

    fn try_from(payload: ExecutionPayload) -> Result<Self, Self::Error> {
        let id = payload
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ContractViolation::missing("execution", "id"))?;
        let status = payload
            .status
            .ok_or_else(|| ContractViolation::missing("execution", "status"))?;

        Ok(Execution {
            id,
            status,
            pipeline_id: payload.pipeline_id.unwrap_or_default(),
            pipeline_name: payload.pipeline_name,
            document_id: payload.document_id.unwrap_or_default(),
            progress: clamp_progress(payload.progress),
            started_at: payload.started_at,
            completed_at: payload.completed_at,
            error_message: payload
                .error_message
                .filter(|_| status == ExecutionStatus::Failed),
            result: payload.result,
        })
    }
}

pub(crate) fn clamp_progress(progress: Option<f64>) -> u8 {
    match progress {
        Some(p) if p.is_finite() => p.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<Execution, ContractViolation> {
        let payload: ExecutionPayload = serde_json::from_str(json).unwrap();
        Execution::try_from(payload)
    }

    #[test]
    fn test_submit_serializes_async_flag() {
        let req = SubmitExecution {
            document_id: "doc-1".to_string(),
            pipeline_id: "pipe-A".to_string(),
            run_async: true,
            parameters: None,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["async"], true);
        assert!(json.get("parameters").is_none());
    }

    #[test]
    fn test_decode_minimal_payload() {
        let execution = decode(r#"{"id":"ex-1","status":"processing","progress":40}"#).unwrap();
        assert_eq!(execution.id, "ex-1");
        assert_eq!(execution.status, ExecutionStatus::Processing);
        assert_eq!(execution.progress, 40);
        assert_eq!(execution.document_id, "");
    }

    #[test]
    fn test_decode_rejects_missing_id() {
        let err = decode(r#"{"status":"pending"}"#).unwrap_err();
        assert_eq!(err, ContractViolation::missing("execution", "id"));

        let err = decode(r#"{"id":"  ","status":"pending"}"#).unwrap_err();
        assert_eq!(err, ContractViolation::missing("execution", "id"));
    }

    #[test]
    fn test_decode_rejects_missing_status() {
        let err = decode(r#"{"id":"ex-1"}"#).unwrap_err();
        assert_eq!(err, ContractViolation::missing("execution", "status"));
    }

    #[test]
    fn test_error_message_only_kept_for_failed() {
        let failed = decode(r#"{"id":"ex-1","status":"failed","error_message":"boom"}"#).unwrap();
        assert_eq!(failed.error_message.as_deref(), Some("boom"));

        let running = decode(r#"{"id":"ex-1","status":"running","error_message":"boom"}"#).unwrap();
        assert_eq!(running.error_message, None);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(clamp_progress(Some(140.0)), 100);
        assert_eq!(clamp_progress(Some(-3.0)), 0);
        assert_eq!(clamp_progress(Some(39.6)), 40);
        assert_eq!(clamp_progress(None), 0);
    }
}
