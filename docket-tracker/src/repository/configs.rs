//! Pipeline configurations repository

use async_trait::async_trait;
use docket_client::{PipelineClient, Result};
use docket_core::domain::PipelineConfig;
use docket_core::dto::pipeline::PipelineConfigDraft;

/// Remote CRUD on pipeline configurations
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<PipelineConfig>>;

    async fn create(&self, draft: &PipelineConfigDraft) -> Result<PipelineConfig>;

    async fn update(&self, config_id: &str, draft: &PipelineConfigDraft) -> Result<PipelineConfig>;

    async fn delete(&self, config_id: &str) -> Result<()>;
}

#[async_trait]
impl ConfigRepository for PipelineClient {
    async fn list(&self) -> Result<Vec<PipelineConfig>> {
        self.list_configs().await
    }

    async fn create(&self, draft: &PipelineConfigDraft) -> Result<PipelineConfig> {
        self.create_config(draft).await
    }

    async fn update(&self, config_id: &str, draft: &PipelineConfigDraft) -> Result<PipelineConfig> {
        self.update_config(config_id, draft).await
    }

    async fn delete(&self, config_id: &str) -> Result<()> {
        self.delete_config(config_id).await
    }
}
