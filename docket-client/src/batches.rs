//! Batch-related API endpoints

use docket_core::domain::batch::Batch;
use docket_core::dto::batch::{BatchPayload, SubmitBatch};

use crate::PipelineClient;
use crate::error::Result;

impl PipelineClient {
    // =============================================================================
    // Batch Lifecycle
    // =============================================================================

    /// Submit many documents to one pipeline as a single batch
    pub async fn submit_batch(&self, req: &SubmitBatch) -> Result<Batch> {
        let url = self.endpoint(&["pipeline", "batch-process"])?;
        let request = self.client.post(url).json(req);

        self.decode_batch(request).await
    }

    /// Get the aggregate status of a batch and its documents
    pub async fn get_batch(&self, batch_id: &str) -> Result<Batch> {
        let url = self.endpoint(&["pipeline", "batch", batch_id])?;
        let request = self.client.get(url);

        self.decode_batch(request).await
    }

    /// Ask the service to stop every remaining document of a batch
    pub async fn cancel_batch(&self, batch_id: &str) -> Result<Batch> {
        let url = self.endpoint(&["pipeline", "batch", batch_id, "cancel"])?;
        let request = self.client.post(url);

        self.decode_batch(request).await
    }

    async fn decode_batch(&self, request: reqwest::RequestBuilder) -> Result<Batch> {
        let payload: BatchPayload = self.execute(request).await?;
        Ok(Batch::try_from(payload)?)
    }
}
