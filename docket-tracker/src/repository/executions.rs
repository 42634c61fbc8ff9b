//! Executions repository

use async_trait::async_trait;
use docket_client::{PipelineClient, Result};
use docket_core::domain::Execution;
use docket_core::dto::execution::SubmitExecution;

/// Remote operations on single executions
#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    /// Submits a document/pipeline pair for processing
    async fn submit(&self, req: &SubmitExecution) -> Result<Execution>;

    /// Fetches the current remote state of an execution
    async fn fetch(&self, execution_id: &str) -> Result<Execution>;

    /// Requests cancellation and returns the resulting state
    async fn cancel(&self, execution_id: &str) -> Result<Execution>;

    /// Requests a retry and returns the resulting state
    async fn retry(&self, execution_id: &str) -> Result<Execution>;
}

#[async_trait]
impl ExecutionRepository for PipelineClient {
    async fn submit(&self, req: &SubmitExecution) -> Result<Execution> {
        self.submit_execution(req).await
    }

    async fn fetch(&self, execution_id: &str) -> Result<Execution> {
        self.get_execution(execution_id).await
    }

    async fn cancel(&self, execution_id: &str) -> Result<Execution> {
        self.cancel_execution(execution_id).await
    }

    async fn retry(&self, execution_id: &str) -> Result<Execution> {
        self.retry_execution(execution_id).await
    }
}
