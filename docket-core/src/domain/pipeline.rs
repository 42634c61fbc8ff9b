//! Pipeline configuration domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A processing pipeline available on the remote service
///
/// Created, updated and deleted only through the remote service; the client
/// holds read-mostly copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub id: String,
    pub name: String,
    /// Tag used to test document/pipeline compatibility
    #[serde(rename = "type")]
    pub pipeline_type: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Ordered processing steps, interpreted only by the remote service
    #[serde(default)]
    pub steps: Vec<PipelineStep>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One opaque processing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl PipelineConfig {
    /// Whether documents tagged `document_type` can run through this pipeline
    pub fn accepts(&self, document_type: &str) -> bool {
        self.pipeline_type.eq_ignore_ascii_case(document_type.trim())
    }
}
