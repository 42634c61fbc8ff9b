//! Execution domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Terminal;

/// Execution lifecycle status
///
/// Statuses are only ordered by terminality: `Completed`, `Failed` and
/// `Canceled` end the lifecycle, everything else may still change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Processing,
    Completed,
    Failed,
    #[serde(alias = "cancelled")]
    Canceled,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single document's pass through one pipeline
///
/// Values are immutable snapshots: the tracker replaces the whole value on
/// every fold instead of mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub status: ExecutionStatus,
    pub pipeline_id: String,
    pub pipeline_name: Option<String>,
    pub document_id: String,
    /// Percentage in `0..=100`; only meaningful while non-terminal
    pub progress: u8,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Present only when `status` is `Failed`
    pub error_message: Option<String>,
    pub result: Option<serde_json::Value>,
}

/// Decision taken when folding a fresh remote snapshot onto the stored one
#[derive(Debug, Clone, PartialEq)]
pub enum Fold<T> {
    /// Store this value in place of the current one
    Replace(T),
    /// Keep the current value; the incoming one is stale
    Discard,
}

impl Execution {
    /// Fold an incoming remote snapshot onto the currently stored one.
    ///
    /// Once a terminal status is stored, it is never replaced by a different
    /// status. While both sides are non-terminal, progress never decreases.
    pub fn fold(current: Option<&Execution>, incoming: Execution) -> Fold<Execution> {
        let Some(current) = current else {
            return Fold::Replace(incoming);
        };
        let incoming = incoming.inherit_identity(current);

        if current.status.is_terminal() {
            return if incoming.status == current.status {
                Fold::Replace(incoming)
            } else {
                Fold::Discard
            };
        }

        if incoming.status.is_terminal() {
            return Fold::Replace(incoming);
        }

        Fold::Replace(Execution {
            progress: incoming.progress.max(current.progress),
            ..incoming
        })
    }

    /// Command responses may omit the pipeline/document identity; keep what
    /// is already known instead of blanking it.
    fn inherit_identity(mut self, current: &Execution) -> Execution {
        if self.pipeline_id.is_empty() {
            self.pipeline_id.clone_from(&current.pipeline_id);
        }
        if self.document_id.is_empty() {
            self.document_id.clone_from(&current.document_id);
        }
        if self.pipeline_name.is_none() {
            self.pipeline_name.clone_from(&current.pipeline_name);
        }
        self
    }
}

impl Terminal for Execution {
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
pub(crate) fn sample(id: &str, status: ExecutionStatus, progress: u8) -> Execution {
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
