//! The file processing queue.

use crate::core::error::{ConfigError, ProcessingError, QuarantineError, ScanError};
use crate::core::{FileHasher, FileInput, ScanConfig, SecurityScan};
use crate::events::{
    emit_quarantine_event, EventPublisher, FileEvent, FileEventKind, TracingPublisher,
};
use crate::policy::{is_scan_required, PolicyAction, SafetyPolicy};
use crate::processing::queue::{
    HandleStatus, ProcessingHandle, ProcessingOutcome, ProcessingQueue,
};
use crate::processing::retry::{retry_async, RetryConfig, RetryFailure};
use crate::quarantine::{InMemoryQuarantine, QuarantineRecord, QuarantineStore};
use crate::scanner::{ArcScanner, SecurityScanService};
use crate::store::{
    BlobStorage, FileRecord, FileRepository, FileStatus, InMemoryBlobStorage,
    InMemoryFileRepository, InMemoryScanStore, ScanResultStore, UploadedFile,
};

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;

/// Builder for creating a [`FileProcessor`].
///
/// Every collaborator has an in-memory default; the scanner defaults to a
/// [`SecurityScanService`] built from the configuration.
#[derive(Default)]
pub struct FileProcessorBuilder {
    config: ScanConfig,
    scanner: Option<ArcScanner>,
    blobs: Option<Arc<dyn BlobStorage>>,
    files: Option<Arc<dyn FileRepository>>,
    scans: Option<Arc<dyn ScanResultStore>>,
    quarantine: Option<Arc<dyn QuarantineStore>>,
    events: Option<Arc<dyn EventPublisher>>,
    policy: SafetyPolicy,
    retry: Option<RetryConfig>,
}

impl FileProcessorBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the scanner.
    pub fn with_scanner(mut self, scanner: ArcScanner) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Sets the blob storage holding upload bytes.
    pub fn with_blob_storage(mut self, blobs: Arc<dyn BlobStorage>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Sets the file repository.
    pub fn with_file_repository(mut self, files: Arc<dyn FileRepository>) -> Self {
        self.files = Some(files);
        self
    }

    /// Sets the scan result store.
    pub fn with_scan_store(mut self, scans: Arc<dyn ScanResultStore>) -> Self {
        self.scans = Some(scans);
        self
    }

    /// Sets the quarantine store.
    pub fn with_quarantine(mut self, quarantine: Arc<dyn QuarantineStore>) -> Self {
        self.quarantine = Some(quarantine);
        self
    }

    /// Sets the event publisher.
    pub fn with_event_publisher(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Sets the publication policy.
    pub fn with_policy(mut self, policy: SafetyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides the retry behavior derived from the configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Builds the processor.
    pub fn build(self) -> Result<Arc<FileProcessor>, ConfigError> {
        self.config.validate()?;

        let scanner = match self.scanner {
            Some(scanner) => scanner,
            None => Arc::new(SecurityScanService::new(&self.config)?),
        };
        let retry = self
            .retry
            .unwrap_or_else(|| RetryConfig::from_scan_config(&self.config));

        Ok(Arc::new(FileProcessor {
            queue: ProcessingQueue::new(self.config.max_concurrent_scans),
            hasher: FileHasher::new(),
            scanner,
            blobs: self.blobs.unwrap_or_else(|| Arc::new(InMemoryBlobStorage::new())),
            files: self
                .files
                .unwrap_or_else(|| Arc::new(InMemoryFileRepository::new())),
            scans: self.scans.unwrap_or_else(|| Arc::new(InMemoryScanStore::new())),
            quarantine: self
                .quarantine
                .unwrap_or_else(|| Arc::new(InMemoryQuarantine::new())),
            events: self.events.unwrap_or_else(|| Arc::new(TracingPublisher::new())),
            policy: self.policy,
            retry,
            config: self.config,
        }))
    }
}

/// Result of asking for a re-scan.
#[derive(Debug)]
pub enum RescanOutcome {
    /// The existing verdict still stands.
    UpToDate(Box<SecurityScan>),
    /// The file was queued again.
    Queued(ProcessingHandle),
}

/// Asynchronous, bounded pipeline that takes uploads from `Pending` to
/// `Processed` or `Quarantined`.
///
/// Each submitted file gets its own task. A task waits for one of
/// `max_concurrent_scans` slots, downloads the bytes, scans them on a
/// blocking thread under `scan_timeout`, persists the verdict and applies
/// the [`SafetyPolicy`]. Download failures and transient `Failed`
/// verdicts are retried with backoff; a verdict marked as a permanent
/// failure ends processing on the first attempt.
pub struct FileProcessor {
    config: ScanConfig,
    scanner: ArcScanner,
    blobs: Arc<dyn BlobStorage>,
    files: Arc<dyn FileRepository>,
    scans: Arc<dyn ScanResultStore>,
    quarantine: Arc<dyn QuarantineStore>,
    events: Arc<dyn EventPublisher>,
    policy: SafetyPolicy,
    retry: RetryConfig,
    queue: ProcessingQueue,
    hasher: FileHasher,
}

impl FileProcessor {
    /// Creates a new builder.
    pub fn builder() -> FileProcessorBuilder {
        FileProcessorBuilder::new()
    }

    /// Stores the bytes of an upload and submits it.
    pub async fn upload(
        self: &Arc<Self>,
        file: UploadedFile,
        data: Vec<u8>,
    ) -> Result<ProcessingHandle, ProcessingError> {
        self.blobs.put(&file.storage_key, data).await?;
        self.submit(file).await
    }

    /// Records an upload whose bytes are already in blob storage as
    /// `Pending`, emits `file.uploaded` and queues it.
    pub async fn submit(
        self: &Arc<Self>,
        file: UploadedFile,
    ) -> Result<ProcessingHandle, ProcessingError> {
        let record = FileRecord::new(file);
        self.files.upsert(record.clone()).await?;

        tracing::info!(
            file_id = %record.file_id(),
            filename = %record.file.filename,
            user_id = %record.file.user_id,
            size = record.file.size,
            "File submitted for processing"
        );
        self.publish(FileEvent::new(FileEventKind::Uploaded, &record))
            .await;

        Ok(self.enqueue(record.file.file_id))
    }

    /// Submits a batch and waits for every file to settle.
    ///
    /// Results are returned in submission order.
    pub async fn process_all(
        self: &Arc<Self>,
        files: Vec<UploadedFile>,
    ) -> Vec<Result<ProcessingOutcome, ProcessingError>> {
        let mut submitted = Vec::with_capacity(files.len());
        for file in files {
            submitted.push(self.submit(file).await);
        }

        let waits = submitted.into_iter().map(|handle| async move {
            match handle {
                Ok(handle) => handle.wait().await,
                Err(e) => Err(e),
            }
        });
        join_all(waits).await
    }

    /// Returns `true` unless the file is approved and its latest scan is a
    /// complete `Clean` verdict.
    pub async fn is_scan_required(&self, file_id: &str) -> Result<bool, ProcessingError> {
        let record = self.record(file_id).await?;
        let latest = self.scans.latest(file_id).await?;
        Ok(is_scan_required(latest.as_ref(), record.approved))
    }

    /// Queues the file again if a scan is required; otherwise returns the
    /// standing verdict.
    ///
    /// Files that are still in flight or quarantined cannot be re-scanned.
    pub async fn rescan(
        self: &Arc<Self>,
        file_id: &str,
    ) -> Result<RescanOutcome, ProcessingError> {
        let record = self.record(file_id).await?;
        let latest = self.scans.latest(file_id).await?;

        if !is_scan_required(latest.as_ref(), record.approved) {
            if let Some(scan) = latest {
                tracing::debug!(file_id = %file_id, scan_id = %scan.id, "Scan not required");
                return Ok(RescanOutcome::UpToDate(Box::new(scan)));
            }
        }

        let claimed = self
            .files
            .compare_and_set_status(
                file_id,
                &[FileStatus::Processed, FileStatus::Failed],
                FileStatus::Pending,
            )
            .await?;
        if let Err(current) = claimed {
            return Err(ProcessingError::InvalidState {
                file_id: file_id.to_string(),
                status: current.status.to_string(),
                expected: "processed or failed",
            });
        }

        tracing::info!(file_id = %file_id, "File queued for re-scan");
        Ok(RescanOutcome::Queued(self.enqueue(file_id.to_string())))
    }

    /// Releases a quarantined file after manual review.
    ///
    /// The bytes are integrity-checked, returned to blob storage and the
    /// quarantine entry is removed. The file becomes `Processed` and
    /// approved.
    pub async fn restore(
        &self,
        file_id: &str,
        reviewer: &str,
    ) -> Result<FileRecord, ProcessingError> {
        let reviewer = reviewer.trim();
        if reviewer.is_empty() {
            return Err(ProcessingError::ReviewerRequired);
        }

        let record = self.record(file_id).await?;
        if record.status != FileStatus::Quarantined {
            return Err(ProcessingError::InvalidState {
                file_id: file_id.to_string(),
                status: record.status.to_string(),
                expected: "quarantined",
            });
        }

        let entry = self
            .quarantine
            .find_by_file(file_id)
            .await?
            .ok_or_else(|| QuarantineError::NotFound {
                id: file_id.to_string(),
            })?;
        let (data, entry) = self.quarantine.retrieve(&entry.id).await?;

        self.blobs.put(&record.file.storage_key, data).await?;
        self.quarantine.delete(&entry.id).await?;
        emit_quarantine_event(&entry, "restore");

        self.files.set_approved(file_id, true).await?;
        let record = self.files.set_status(file_id, FileStatus::Processed).await?;

        tracing::info!(file_id = %file_id, reviewer = %reviewer, "Quarantined file restored");
        self.publish(
            FileEvent::new(FileEventKind::Restored, &record)
                .with_scan(&entry.scan)
                .with_detail(format!("Restored by {}", reviewer)),
        )
        .await;

        Ok(record)
    }

    /// Returns the file repository.
    pub fn files(&self) -> &Arc<dyn FileRepository> {
        &self.files
    }

    /// Returns the scan result store.
    pub fn scans(&self) -> &Arc<dyn ScanResultStore> {
        &self.scans
    }

    /// Returns the quarantine store.
    pub fn quarantine(&self) -> &Arc<dyn QuarantineStore> {
        &self.quarantine
    }

    /// Returns the blob storage.
    pub fn blobs(&self) -> &Arc<dyn BlobStorage> {
        &self.blobs
    }

    /// Returns the worker queue.
    pub fn queue(&self) -> &ProcessingQueue {
        &self.queue
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn enqueue(self: &Arc<Self>, file_id: String) -> ProcessingHandle {
        let (status_tx, status_rx) = watch::channel(HandleStatus::Pending);
        self.queue.add_pending();

        let processor = Arc::clone(self);
        let worker_file_id = file_id.clone();
        let task = tokio::spawn(async move {
            let result = processor.process(&worker_file_id, &status_tx).await;
            match &result {
                Ok(_) => {
                    status_tx.send_replace(HandleStatus::Complete);
                }
                Err(e) => {
                    status_tx.send_replace(HandleStatus::Failed {
                        error: e.to_string(),
                    });
                }
            }
            result
        });

        ProcessingHandle::new(file_id, status_rx, task)
    }

    async fn process(
        &self,
        file_id: &str,
        status: &watch::Sender<HandleStatus>,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let _slot = self.queue.acquire().await?;
        status.send_replace(HandleStatus::InProgress);
        let started = Utc::now();

        let record = self.files.set_status(file_id, FileStatus::Scanning).await?;
        tracing::debug!(file_id = %file_id, "Worker picked up file");

        match self.process_record(&record).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(file_id = %file_id, error = %e, "File processing failed");
                if let Err(err) = self.files.set_status(file_id, FileStatus::Failed).await {
                    tracing::warn!(file_id = %file_id, error = %err, "Could not mark file failed");
                }
                let mut event = FileEvent::new(FileEventKind::ProcessingFailed, &record)
                    .with_detail(e.to_string());
                if let Some(scan) = self.failed_scan_since(file_id, started).await {
                    event = event.with_scan(&scan);
                }
                self.publish(event).await;
                Err(e)
            }
        }
    }

    async fn process_record(
        &self,
        record: &FileRecord,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let file_id = record.file_id();

        let (scan, data, attempts) = self.scan_with_retry(record).await?;

        let verdict_status = if scan.is_clean() {
            FileStatus::Clean
        } else {
            FileStatus::Infected
        };
        let record = self.files.set_status(file_id, verdict_status).await?;
        self.publish(FileEvent::new(FileEventKind::Scanned, &record).with_scan(&scan))
            .await;

        let decision = self.policy.evaluate(&scan);
        let (status, quarantine_id) = match decision.action {
            PolicyAction::Publish => {
                let record = self.files.set_status(file_id, FileStatus::Processed).await?;
                tracing::info!(file_id = %file_id, scan_id = %scan.id, "File published");
                self.publish(FileEvent::new(FileEventKind::Processed, &record).with_scan(&scan))
                    .await;
                (FileStatus::Processed, None)
            }
            PolicyAction::Quarantine { reason } => {
                let entry = QuarantineRecord::new(
                    file_id,
                    self.hasher.hash_bytes(&data),
                    data.len() as u64,
                    reason.clone(),
                    scan.clone(),
                )
                .with_user_id(record.file.user_id.clone())
                .with_original_filename(record.file.filename.clone());

                let quarantine_id = self.quarantine.store(&data, entry.clone()).await?;
                emit_quarantine_event(&entry, "store");
                if let Err(err) = self.blobs.delete(&record.file.storage_key).await {
                    tracing::warn!(
                        file_id = %file_id,
                        error = %err,
                        "Could not remove quarantined bytes from blob storage"
                    );
                }

                let record = self.files.set_status(file_id, FileStatus::Quarantined).await?;
                tracing::warn!(
                    file_id = %file_id,
                    scan_id = %scan.id,
                    reason = %reason,
                    "File quarantined"
                );
                self.publish(
                    FileEvent::new(FileEventKind::Quarantined, &record)
                        .with_scan(&scan)
                        .with_detail(reason),
                )
                .await;
                (FileStatus::Quarantined, Some(quarantine_id))
            }
        };

        Ok(ProcessingOutcome {
            file_id: file_id.to_string(),
            scan,
            status,
            quarantine_id,
            attempts,
        })
    }

    /// Downloads and scans until a verdict other than `Failed` is reached.
    async fn scan_with_retry(
        &self,
        record: &FileRecord,
    ) -> Result<(SecurityScan, Vec<u8>, u32), ProcessingError> {
        let file_id = record.file_id();
        let mut attempts = 0;

        let result = retry_async(&self.retry, ProcessingError::is_recoverable, || {
            attempts += 1;
            self.attempt(record)
        })
        .await;

        match result {
            Ok((scan, data)) => Ok((scan, data, attempts)),
            Err(RetryFailure { error, attempts }) if error.is_recoverable() => {
                Err(ProcessingError::RetriesExhausted {
                    file_id: file_id.to_string(),
                    attempts,
                    last_error: error.to_string(),
                })
            }
            Err(RetryFailure { error, .. }) => Err(error),
        }
    }

    async fn attempt(
        &self,
        record: &FileRecord,
    ) -> Result<(SecurityScan, Vec<u8>), ProcessingError> {
        let file_id = record.file_id();
        let data = self
            .blobs
            .get(&record.file.storage_key)
            .await
            .map_err(|source| ProcessingError::Download {
                file_id: file_id.to_string(),
                source,
            })?;

        let mut input =
            FileInput::from_bytes(data.clone()).with_filename(record.file.filename.clone());
        if let Some(content_type) = &record.file.content_type {
            input = input.with_content_type(content_type.clone());
        }

        let scan = self.run_scan(input).await;
        self.scans.save(file_id, &scan).await?;

        if scan.is_failed() {
            let comment = scan.comments.clone().unwrap_or_default();
            let file_id = file_id.to_string();
            return Err(if scan.permanent_failure {
                ProcessingError::Unscannable { file_id, comment }
            } else {
                ProcessingError::ScanFailed { file_id, comment }
            });
        }
        Ok((scan, data))
    }

    /// Runs the scanner on a blocking thread, bounded by `scan_timeout`.
    ///
    /// A scan that overruns is reported as `Failed`; the blocking thread
    /// is left to finish on its own.
    async fn run_scan(&self, input: FileInput) -> SecurityScan {
        let scanner = Arc::clone(&self.scanner);
        let timeout = self.config.scan_timeout;
        let task = tokio::task::spawn_blocking(move || scanner.scan(&input));

        let error = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(scan)) => return scan,
            Ok(Err(e)) => ScanError::internal(format!("scan worker aborted: {}", e)),
            Err(_) => ScanError::Timeout { elapsed: timeout },
        };
        tracing::warn!(error = %error, "Scan did not produce a verdict");
        SecurityScan::start().fail(format!("Scan failed: {}", error))
    }

    /// The most recent `Failed` verdict saved since `since`, if any.
    async fn failed_scan_since(
        &self,
        file_id: &str,
        since: chrono::DateTime<Utc>,
    ) -> Option<SecurityScan> {
        match self.scans.latest(file_id).await {
            Ok(latest) => latest.filter(|scan| scan.is_failed() && scan.scanned_at >= since),
            Err(e) => {
                tracing::warn!(file_id = %file_id, error = %e, "Could not load failed scan");
                None
            }
        }
    }

    async fn record(&self, file_id: &str) -> Result<FileRecord, ProcessingError> {
        self.files
            .get(file_id)
            .await?
            .ok_or_else(|| ProcessingError::UnknownFile {
                file_id: file_id.to_string(),
            })
    }

    async fn publish(&self, event: FileEvent) {
        self.events.publish(&event).await;
    }
}

impl std::fmt::Debug for FileProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileProcessor")
            .field("scanner", &self.scanner.name())
            .field("max_concurrent", &self.queue.max_concurrent())
            .field("active", &self.queue.active_count())
            .field("pending", &self.queue.pending_count())
            .finish()
    }
}
