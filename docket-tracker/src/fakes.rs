//! Scripted in-memory repositories and a recording notifier for tests

use async_trait::async_trait;
use docket_client::{ClientError, Result};
use docket_core::domain::{
    Batch, BatchDocument, Execution, ExecutionStatus, PipelineConfig,
};
use docket_core::dto::batch::SubmitBatch;
use docket_core::dto::execution::SubmitExecution;
use docket_core::dto::pipeline::PipelineConfigDraft;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::notify::{Notice, Notifier};
use crate::repository::{BatchRepository, ConfigRepository, ExecutionRepository};

/// Queue of canned responses for one remote operation
pub(crate) struct Script<T> {
    responses: Mutex<VecDeque<Result<T>>>,
    calls: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            gate: Mutex::new(None),
        }
    }
}

impl<T> Script<T> {
    pub(crate) fn ok(&self, value: T) {
        self.responses.lock().unwrap().push_back(Ok(value));
    }

    pub(crate) fn err(&self, err: ClientError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make the next call wait for the returned gate before it responds
    pub(crate) fn hold_next(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    async fn next(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Transport("no scripted response".into())));

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        response
    }
}

#[derive(Default)]
pub(crate) struct FakeExecutions {
    pub submit: Script<Execution>,
    pub fetch: Script<Execution>,
    pub cancel: Script<Execution>,
    pub retry: Script<Execution>,
}

#[async_trait]
impl ExecutionRepository for FakeExecutions {
    async fn submit(&self, _req: &SubmitExecution) -> Result<Execution> {
        self.submit.next().await
    }

    async fn fetch(&self, _execution_id: &str) -> Result<Execution> {
        self.fetch.next().await
    }

    async fn cancel(&self, _execution_id: &str) -> Result<Execution> {
        self.cancel.next().await
    }

    async fn retry(&self, _execution_id: &str) -> Result<Execution> {
        self.retry.next().await
    }
}

#[derive(Default)]
pub(crate) struct FakeBatches {
    pub submit: Script<Batch>,
    pub fetch: Script<Batch>,
    pub cancel: Script<Batch>,
}

#[async_trait]
impl BatchRepository for FakeBatches {
    async fn submit(&self, _req: &SubmitBatch) -> Result<Batch> {
        self.submit.next().await
    }

    async fn fetch(&self, _batch_id: &str) -> Result<Batch> {
        self.fetch.next().await
    }

    async fn cancel(&self, _batch_id: &str) -> Result<Batch> {
        self.cancel.next().await
    }
}

#[derive(Default)]
pub(crate) struct FakeConfigs {
    pub list: Script<Vec<PipelineConfig>>,
    pub create: Script<PipelineConfig>,
    pub update: Script<PipelineConfig>,
    pub delete: Script<()>,
}

#[async_trait]
impl ConfigRepository for FakeConfigs {
    async fn list(&self) -> Result<Vec<PipelineConfig>> {
        self.list.next().await
    }

    async fn create(&self, _draft: &PipelineConfigDraft) -> Result<PipelineConfig> {
        self.create.next().await
    }

    async fn update(&self, _config_id: &str, _draft: &PipelineConfigDraft) -> Result<PipelineConfig> {
        self.update.next().await
    }

    async fn delete(&self, _config_id: &str) -> Result<()> {
        self.delete.next().await
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    redirects: AtomicUsize,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub(crate) fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }

    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn execution(id: &str, status: ExecutionStatus, progress: u8) -> Execution {
    Execution {
        id: id.to_string(),
        status,
        pipeline_id: "pipe-A".to_string(),
        pipeline_name: None,
        document_id: "doc-1".to_string(),
        progress,
        started_at: None,
        completed_at: None,
        error_message: None,
        result: None,
    }
}

pub(crate) fn batch(id: &str, status: ExecutionStatus, documents: &[(&str, ExecutionStatus)]) -> Batch {
    Batch {
        id: id.to_string(),
        status,
        pipeline_id: Some("pipe-A".to_string()),
        total_documents: documents.len(),
        documents: documents
            .iter()
            .map(|(document_id, status)| BatchDocument {
                document_id: document_id.to_string(),
                execution_id: None,
                status: *status,
                error_message: None,
            })
            .collect(),
        created_at: None,
        completed_at: None,
    }
}

pub(crate) fn config(id: &str, pipeline_type: &str) -> PipelineConfig {
    PipelineConfig {
        id: id.to_string(),
        name: format!("{id} pipeline"),
        pipeline_type: pipeline_type.to_string(),
        description: None,
        steps: Vec::new(),
        created_at: None,
        updated_at: None,
    }
}
