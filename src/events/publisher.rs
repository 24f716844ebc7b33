//! Event publishers.

use crate::events::audit::emit_file_event;
use crate::events::event::{FileEvent, FileEventKind};

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Delivers file lifecycle events.
///
/// Publishing never fails the caller; implementations log delivery
/// problems themselves.
#[async_trait]
pub trait EventPublisher: Send + Sync + Debug {
    /// Publishes one event.
    async fn publish(&self, event: &FileEvent);
}

/// Writes events to the `modscan::audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPublisher;

impl TracingPublisher {
    /// Creates a new publisher.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingPublisher {
    async fn publish(&self, event: &FileEvent) {
        emit_file_event(event);
    }
}

/// Forwards events to in-process subscribers over a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<FileEvent>,
}

impl BroadcastPublisher {
    /// Creates a channel holding up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<FileEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, event: &FileEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(
                event_type = event.kind.as_str(),
                file_id = %event.file_id,
                "No event subscribers"
            );
        }
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<FileEvent>>,
}

impl RecordingPublisher {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events in publication order.
    pub async fn events(&self) -> Vec<FileEvent> {
        self.events.lock().await.clone()
    }

    /// Returns the kinds of events recorded for a file, in order.
    pub async fn kinds_for(&self, file_id: &str) -> Vec<FileEventKind> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.file_id == file_id)
            .map(|e| e.kind)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &FileEvent) {
        self.events.lock().await.push(event.clone());
    }
}

/// Publishes each event to several publishers in order.
#[derive(Debug, Default, Clone)]
pub struct FanoutPublisher {
    publishers: Vec<Arc<dyn EventPublisher>>,
}

impl FanoutPublisher {
    /// Creates a fan-out with no targets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target.
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    /// Returns the number of targets.
    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    /// Returns `true` if there are no targets.
    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}

#[async_trait]
impl EventPublisher for FanoutPublisher {
    async fn publish(&self, event: &FileEvent) {
        for publisher in &self.publishers {
            publisher.publish(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileRecord, UploadedFile};

    fn event(kind: FileEventKind) -> FileEvent {
        let record = FileRecord::new(UploadedFile::new("u1", "alice", "a.zip", 1).with_file_id("f1"));
        FileEvent::new(kind, &record)
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscribers() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();

        publisher.publish(&event(FileEventKind::Scanned)).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, FileEventKind::Scanned);
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_silent() {
        let publisher = BroadcastPublisher::new(1);
        publisher.publish(&event(FileEventKind::Uploaded)).await;
    }

    #[tokio::test]
    async fn test_fanout_reaches_every_target() {
        let first = Arc::new(RecordingPublisher::new());
        let second = Arc::new(RecordingPublisher::new());
        let fanout = FanoutPublisher::new()
            .with_publisher(first.clone())
            .with_publisher(second.clone())
            .with_publisher(Arc::new(TracingPublisher::new()));
        assert_eq!(fanout.len(), 3);

        fanout.publish(&event(FileEventKind::Uploaded)).await;
        fanout.publish(&event(FileEventKind::Processed)).await;

        assert_eq!(
            first.kinds_for("f1").await,
            vec![FileEventKind::Uploaded, FileEventKind::Processed]
        );
        assert_eq!(second.events().await.len(), 2);
    }
}
