//! Pipeline configuration API endpoints

use docket_core::domain::pipeline::PipelineConfig;
use docket_core::dto::pipeline::{PipelineConfigDraft, PipelineConfigPayload};

use crate::PipelineClient;
use crate::error::Result;

impl PipelineClient {
    // =============================================================================
    // Pipeline Configurations
    // =============================================================================

    /// List all pipeline configurations
    pub async fn list_configs(&self) -> Result<Vec<PipelineConfig>> {
        let url = self.endpoint(&["pipelines", "configs"])?;
        let payloads: Vec<PipelineConfigPayload> = self.execute(self.client.get(url)).await?;

        payloads
            .into_iter()
            .map(|payload| PipelineConfig::try_from(payload).map_err(Into::into))
            .collect()
    }

    /// Create a new pipeline configuration
    pub async fn create_config(&self, draft: &PipelineConfigDraft) -> Result<PipelineConfig> {
        let url = self.endpoint(&["pipelines", "configs"])?;
        let payload: PipelineConfigPayload = self.execute(self.client.post(url).json(draft)).await?;
        Ok(PipelineConfig::try_from(payload)?)
    }

    /// Replace an existing pipeline configuration
    pub async fn update_config(
        &self,
        config_id: &str,
        draft: &PipelineConfigDraft,
    ) -> Result<PipelineConfig> {
        let url = self.endpoint(&["pipelines", "configs", config_id])?;
        let payload: PipelineConfigPayload = self.execute(self.client.put(url).json(draft)).await?;
        Ok(PipelineConfig::try_from(payload)?)
    }

    /// Delete a pipeline configuration
    pub async fn delete_config(&self, config_id: &str) -> Result<()> {
        let url = self.endpoint(&["pipelines", "configs", config_id])?;
        self.execute_empty(self.client.delete(url)).await
    }
}
