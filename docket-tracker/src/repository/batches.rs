//! Batches repository

use async_trait::async_trait;
use docket_client::{PipelineClient, Result};
use docket_core::domain::Batch;
use docket_core::dto::batch::SubmitBatch;

/// Remote operations on batches
#[async_trait]
pub trait BatchRepository: Send + Sync {
    async fn submit(&self, req: &SubmitBatch) -> Result<Batch>;

    async fn fetch(&self, batch_id: &str) -> Result<Batch>;

    async fn cancel(&self, batch_id: &str) -> Result<Batch>;
}

#[async_trait]
impl BatchRepository for PipelineClient {
    async fn submit(&self, req: &SubmitBatch) -> Result<Batch> {
        self.submit_batch(req).await
    }

    async fn fetch(&self, batch_id: &str) -> Result<Batch> {
        self.get_batch(batch_id).await
    }

    async fn cancel(&self, batch_id: &str) -> Result<Batch> {
        self.cancel_batch(batch_id).await
    }
}
