//! Batch domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Terminal;
use super::execution::{ExecutionStatus, Fold};

/// A group of executions submitted together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub status: ExecutionStatus,
    pub pipeline_id: Option<String>,
    pub total_documents: usize,
    /// Per-document results as last reported by the service
    pub documents: Vec<BatchDocument>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One document's state inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDocument {
    pub document_id: String,
    pub execution_id: Option<String>,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
}

/// Document ids of a batch partitioned by outcome
///
/// Always derived from a full batch snapshot, never updated incrementally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub success: Vec<String>,
    pub failed: Vec<String>,
    pub in_progress: Vec<String>,
}

impl BatchProgress {
    /// Partition the documents of `batch`.
    ///
    /// Duplicate document entries collapse to the last one reported, and at
    /// most `total_documents` documents are counted.
    pub fn from_batch(batch: &Batch) -> Self {
        let mut order: Vec<&str> = Vec::new();
        let mut latest: HashMap<&str, ExecutionStatus> = HashMap::new();

        for doc in &batch.documents {
            if latest.insert(&doc.document_id, doc.status).is_none() {
                order.push(&doc.document_id);
            }
        }

        let mut progress = Self::default();
        for document_id in order.into_iter().take(batch.total_documents) {
            let bucket = match latest[document_id] {
                ExecutionStatus::Completed => &mut progress.success,
                ExecutionStatus::Failed | ExecutionStatus::Canceled => &mut progress.failed,
                _ => &mut progress.in_progress,
            };
            bucket.push(document_id.to_string());
        }

        progress
    }

    pub fn counted(&self) -> usize {
        self.success.len() + self.failed.len() + self.in_progress.len()
    }
}

/// A batch snapshot together with its derived document partitions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedBatch {
    pub batch: Batch,
    pub progress: BatchProgress,
}

impl TrackedBatch {
    pub fn new(batch: Batch) -> Self {
        let progress = BatchProgress::from_batch(&batch);
        Self { batch, progress }
    }

    pub fn id(&self) -> &str {
        &self.batch.id
    }

    /// Fold an incoming batch snapshot onto the stored one.
    ///
    /// Follows the same terminality rule as executions. Partitions are
    /// recomputed from the incoming snapshot alone.
    pub fn fold(current: Option<&TrackedBatch>, incoming: Batch) -> Fold<TrackedBatch> {
        match current {
            Some(current)
                if current.batch.status.is_terminal() && incoming.status != current.batch.status =>
            {
                Fold::Discard
            }
            _ => Fold::Replace(Self::new(incoming)),
        }
    }
}

impl Terminal for TrackedBatch {
    fn is_terminal(&self) -> bool {
        self.batch.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExecutionStatus::*;

    fn doc(id: &str, status: ExecutionStatus) -> BatchDocument {
        BatchDocument {
            document_id: id.to_string(),
            execution_id: None,
            status,
            error_message: None,
        }
    }

    fn batch(status: ExecutionStatus, total: usize, documents: Vec<BatchDocument>) -> Batch {
        Batch {
            id: "batch-1".to_string(),
            status,
            pipeline_id: Some("pipe-A".to_string()),
            total_documents: total,
            documents,
            created_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_progress_partitions_by_status() {
        let progress = BatchProgress::from_batch(&batch(
            Processing,
            5,
            vec![
                doc("a", Completed),
                doc("b", Failed),
                doc("c", Canceled),
                doc("d", Running),
                doc("e", Pending),
            ],
        ));

        assert_eq!(progress.success, vec!["a"]);
        assert_eq!(progress.failed, vec!["b", "c"]);
        assert_eq!(progress.in_progress, vec!["d", "e"]);
    }

    #[test]
    fn test_progress_never_exceeds_total_documents() {
        let progress = BatchProgress::from_batch(&batch(
            Processing,
            2,
            vec![doc("a", Completed), doc("b", Completed), doc("c", Failed)],
        ));
        assert_eq!(progress.counted(), 2);

        // Duplicates collapse to the latest entry instead of double counting
        let progress = BatchProgress::from_batch(&batch(
            Processing,
            2,
            vec![doc("a", Running), doc("a", Completed), doc("b", Running)],
        ));
        assert_eq!(progress.success, vec!["a"]);
        assert_eq!(progress.in_progress, vec!["b"]);
        assert!(progress.counted() <= 2);
    }

    #[test]
    fn test_fold_recomputes_partitions_from_latest_snapshot() {
        let first = TrackedBatch::new(batch(
            Processing,
            2,
            vec![doc("a", Completed), doc("b", Running)],
        ));

        // Server now reports "a" as failed; no trace of the old success survives
        let next = batch(Processing, 2, vec![doc("a", Failed), doc("b", Running)]);
        match TrackedBatch::fold(Some(&first), next) {
            Fold::Replace(tracked) => {
                assert!(tracked.progress.success.is_empty());
                assert_eq!(tracked.progress.failed, vec!["a"]);
            }
            Fold::Discard => panic!("non-terminal batch update should be stored"),
        }
    }

    #[test]
    fn test_fold_keeps_terminal_batch() {
        let done = TrackedBatch::new(batch(Completed, 1, vec![doc("a", Completed)]));
        let stale = batch(Processing, 1, vec![doc("a", Running)]);

        assert_eq!(TrackedBatch::fold(Some(&done), stale), Fold::Discard);
    }
}
