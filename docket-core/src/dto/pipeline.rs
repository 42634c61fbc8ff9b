//! Pipeline configuration DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ContractViolation;
use crate::domain::pipeline::{PipelineConfig, PipelineStep};

/// Body for creating or updating a pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfigDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub pipeline_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<PipelineStep>,
}

impl From<&PipelineConfig> for PipelineConfigDraft {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            name: config.name.clone(),
            pipeline_type: config.pipeline_type.clone(),
            description: config.description.clone(),
            steps: config.steps.clone(),
        }
    }
}

/// Pipeline configuration as returned by the service, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfigPayload {
    #[serde(alias = "pipeline_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub pipeline_type: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<PipelineStep>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<PipelineConfigPayload> for PipelineConfig {
    type Error = ContractViolation;

    fn try_from(payload: PipelineConfigPayload) -> Result<Self, Self::Error> {
        let id = payload
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ContractViolation::missing("pipeline config", "id"))?;
        let pipeline_type = payload
            .pipeline_type
            .ok_or_else(|| ContractViolation::missing("pipeline config", "type"))?;

        Ok(PipelineConfig {
            name: payload.name.unwrap_or_else(|| id.clone()),
            id,
            pipeline_type,
            description: payload.description,
            steps: payload.steps,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
        })
    }
}
