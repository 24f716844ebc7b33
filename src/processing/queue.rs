//! Bounded worker slots and handles for queued files.

use crate::core::error::ProcessingError;
use crate::core::SecurityScan;
use crate::quarantine::QuarantineId;
use crate::store::FileStatus;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// The result of processing one file to a settled status.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    /// File identifier.
    pub file_id: String,
    /// The verdict that decided the file's fate.
    pub scan: SecurityScan,
    /// `Processed` or `Quarantined`.
    pub status: FileStatus,
    /// Quarantine entry, when the file was withheld.
    pub quarantine_id: Option<QuarantineId>,
    /// Attempts needed to reach a verdict.
    pub attempts: u32,
}

/// Progress of a queued file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleStatus {
    /// Waiting for a worker slot.
    Pending,
    /// A worker is processing the file.
    InProgress,
    /// The file reached `Processed` or `Quarantined`.
    Complete,
    /// Processing gave up.
    Failed {
        /// Error message.
        error: String,
    },
}

/// A handle to a file in the processing queue.
#[derive(Debug)]
pub struct ProcessingHandle {
    file_id: String,
    status: watch::Receiver<HandleStatus>,
    task: JoinHandle<Result<ProcessingOutcome, ProcessingError>>,
}

impl ProcessingHandle {
    pub(crate) fn new(
        file_id: String,
        status: watch::Receiver<HandleStatus>,
        task: JoinHandle<Result<ProcessingOutcome, ProcessingError>>,
    ) -> Self {
        Self {
            file_id,
            status,
            task,
        }
    }

    /// Returns the file this handle tracks.
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Returns the current status.
    pub fn status(&self) -> HandleStatus {
        self.status.borrow().clone()
    }

    /// Returns true once the worker finished, successfully or not.
    pub fn is_complete(&self) -> bool {
        matches!(
            self.status(),
            HandleStatus::Complete | HandleStatus::Failed { .. }
        )
    }

    /// Returns true if the file is still waiting for a slot.
    pub fn is_pending(&self) -> bool {
        matches!(self.status(), HandleStatus::Pending)
    }

    /// Waits for the worker and returns its result.
    pub async fn wait(self) -> Result<ProcessingOutcome, ProcessingError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ProcessingError::WorkerAborted {
                reason: e.to_string(),
            }),
        }
    }
}

/// Limits how many files are scanned at once.
#[derive(Debug)]
pub struct ProcessingQueue {
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
    active_count: Arc<AtomicU64>,
    pending_count: AtomicU64,
}

impl ProcessingQueue {
    /// Creates a queue with the given concurrency limit.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            active_count: Arc::new(AtomicU64::new(0)),
            pending_count: AtomicU64::new(0),
        }
    }

    /// Returns the maximum number of concurrent workers.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Returns the number of workers holding a slot.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Returns the number of files waiting for a slot.
    pub fn pending_count(&self) -> u64 {
        self.pending_count.load(Ordering::Relaxed)
    }

    /// Returns true if every slot is taken.
    pub fn is_full(&self) -> bool {
        self.semaphore.available_permits() == 0
    }

    pub(crate) fn add_pending(&self) {
        self.pending_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Waits for a free slot. The slot is released when the guard drops.
    pub(crate) async fn acquire(&self) -> Result<QueueSlot, ProcessingError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| ProcessingError::WorkerAborted {
                reason: e.to_string(),
            });

        self.pending_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |val| {
                Some(val.saturating_sub(1))
            })
            .ok();

        let permit = permit?;
        self.active_count.fetch_add(1, Ordering::SeqCst);
        Ok(QueueSlot {
            _permit: permit,
            active_count: Arc::clone(&self.active_count),
        })
    }
}

impl Default for ProcessingQueue {
    fn default() -> Self {
        Self::new(4)
    }
}

/// A held worker slot.
#[derive(Debug)]
pub(crate) struct QueueSlot {
    _permit: OwnedSemaphorePermit,
    active_count: Arc<AtomicU64>,
}

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_slots() {
        let queue = ProcessingQueue::new(2);
        assert_eq!(queue.max_concurrent(), 2);
        queue.add_pending();
        queue.add_pending();
        assert_eq!(queue.pending_count(), 2);

        let first = queue.acquire().await.unwrap();
        let second = queue.acquire().await.unwrap();
        assert_eq!(queue.active_count(), 2);
        assert_eq!(queue.pending_count(), 0);
        assert!(queue.is_full());

        drop(first);
        assert_eq!(queue.active_count(), 1);
        assert!(!queue.is_full());
        drop(second);
        assert_eq!(queue.active_count(), 0);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        assert_eq!(ProcessingQueue::new(0).max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_handle_transitions() {
        let (tx, rx) = watch::channel(HandleStatus::Pending);
        let task = tokio::spawn(async {
            Err(ProcessingError::UnknownFile {
                file_id: "f1".into(),
            })
        });
        let handle = ProcessingHandle::new("f1".into(), rx, task);
        assert!(handle.is_pending());

        tx.send_replace(HandleStatus::InProgress);
        assert!(!handle.is_complete());

        tx.send_replace(HandleStatus::Failed {
            error: "unknown file".into(),
        });
        assert!(handle.is_complete());

        assert!(matches!(
            handle.wait().await,
            Err(ProcessingError::UnknownFile { .. })
        ));
    }
}
