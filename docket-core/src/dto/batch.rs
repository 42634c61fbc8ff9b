//! Batch DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ContractViolation;
use crate::domain::batch::{Batch, BatchDocument};
use crate::domain::execution::ExecutionStatus;

/// Request to process many documents through one pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBatch {
    pub document_ids: Vec<String>,
    pub pipeline_id: String,
}

/// Batch as returned by the service, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchPayload {
    #[serde(alias = "batch_id")]
    pub id: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub pipeline_id: Option<String>,
    pub total_documents: Option<usize>,
    #[serde(default, alias = "results", alias = "executions")]
    pub documents: Vec<BatchDocumentPayload>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-document entry inside a batch payload
#[derive(Debug, Clone, Deserialize)]
pub struct BatchDocumentPayload {
    pub document_id: Option<String>,
    #[serde(alias = "id")]
    pub execution_id: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub error_message: Option<String>,
}

impl TryFrom<BatchPayload> for Batch {
    type Error = ContractViolation;

    fn try_from(payload: BatchPayload) -> Result<Self, Self::Error> {
        let id = payload
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ContractViolation::missing("batch", "id"))?;
        let status = payload
            .status
            .ok_or_else(|| ContractViolation::missing("batch", "status"))?;

        let documents = payload
            .documents
            .into_iter()
            .map(BatchDocument::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        // Without an explicit total, the reported documents are the whole batch
        let total_documents = payload.total_documents.unwrap_or(documents.len());

        Ok(Batch {
            id,
            status,
            pipeline_id: payload.pipeline_id,
            total_documents,
            documents,
            created_at: payload.created_at,
            completed_at: payload.completed_at,
        })
    }
}

impl TryFrom<BatchDocumentPayload> for BatchDocument {
    type Error = ContractViolation;

    fn try_from(payload: BatchDocumentPayload) -> Result<Self, Self::Error> {
        let document_id = payload
            .document_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ContractViolation::missing("batch document", "document_id"))?;

        Ok(BatchDocument {
            document_id,
            execution_id: payload.execution_id,
            status: payload.status.unwrap_or(ExecutionStatus::Pending),
            error_message: payload.error_message,
        })
    }
}
