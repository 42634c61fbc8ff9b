//! Execution-related API endpoints

use docket_core::domain::execution::Execution;
use docket_core::dto::execution::{ExecutionPayload, SubmitExecution};

use crate::PipelineClient;
use crate::error::Result;

impl PipelineClient {
    // =============================================================================
    // Execution Lifecycle
    // =============================================================================

    /// Submit a document for processing by a pipeline
    ///
    /// # Arguments
    /// * `req` - Document, pipeline and run options
    ///
    /// # Returns
    /// The execution as created by the service
    pub async fn submit_execution(&self, req: &SubmitExecution) -> Result<Execution> {
        let url = self.endpoint(&["pipeline", "process"])?;
        let request = self.client.post(url).json(req);

        self.decode_execution(request).await
    }

    /// Get the current status of an execution
    ///
    /// # Arguments
    /// * `execution_id` - The execution id assigned on submission
    pub async fn get_execution(&self, execution_id: &str) -> Result<Execution> {
        let url = self.endpoint(&["pipeline", "execution", execution_id])?;
        let request = self.client.get(url);

        self.decode_execution(request).await
    }

    /// Ask the service to run a finished execution again
    pub async fn retry_execution(&self, execution_id: &str) -> Result<Execution> {
        let url = self.endpoint(&["pipeline", "execution", execution_id, "retry"])?;
        let request = self.client.post(url);

        self.decode_execution(request).await
    }

    /// Ask the service to stop an execution
    pub async fn cancel_execution(&self, execution_id: &str) -> Result<Execution> {
        let url = self.endpoint(&["pipeline", "execution", execution_id, "cancel"])?;
        let request = self.client.post(url);

        self.decode_execution(request).await
    }

    async fn decode_execution(&self, request: reqwest::RequestBuilder) -> Result<Execution> {
        let payload: ExecutionPayload = self.execute(request).await?;
        Ok(Execution::try_from(payload)?)
    }
}
