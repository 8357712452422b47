//! Event types for the SayMore element store
//!
//! Provides shared event definitions and the EventBus used to tell other
//! parts of the program (a UI, background workers, the CLI) what happened to
//! project elements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Element events
///
/// Events are broadcast via EventBus and can be serialized for logging or
/// transmission to a front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElementEvent {
    /// A new element folder and settings file were created
    ElementCreated {
        /// "Session" or "Person"
        kind: String,
        /// Element id (folder name)
        id: String,
        timestamp: DateTime<Utc>,
    },

    /// An element was renamed on disk
    ElementIdChanged {
        kind: String,
        old_id: String,
        new_id: String,
        timestamp: DateTime<Utc>,
    },

    /// An element's component file cache was dropped; the next read rescans
    ComponentFilesRefreshed {
        id: String,
        timestamp: DateTime<Utc>,
    },

    /// A cached component file was re-parsed after a change on disk
    ComponentFileChanged {
        id: String,
        path: PathBuf,
        timestamp: DateTime<Utc>,
    },

    /// Background processing should pause (bulk copy in progress)
    BackgroundProcessingSuspended {
        /// Nesting depth after this suspend
        depth: usize,
        timestamp: DateTime<Utc>,
    },

    /// Background processing may continue
    BackgroundProcessingResumed {
        /// Nesting depth after this resume (0 means fully resumed)
        depth: usize,
        /// Whether work queued during the pause should be processed now
        process_pending: bool,
        timestamp: DateTime<Utc>,
    },

    /// A failure that was reported to the user but did not stop the operation
    NonFatalError {
        message: String,
        path: Option<PathBuf>,
        timestamp: DateTime<Utc>,
    },
}

impl ElementEvent {
    /// Short event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ElementEvent::ElementCreated { .. } => "ElementCreated",
            ElementEvent::ElementIdChanged { .. } => "ElementIdChanged",
            ElementEvent::ComponentFilesRefreshed { .. } => "ComponentFilesRefreshed",
            ElementEvent::ComponentFileChanged { .. } => "ComponentFileChanged",
            ElementEvent::BackgroundProcessingSuspended { .. } => "BackgroundProcessingSuspended",
            ElementEvent::BackgroundProcessingResumed { .. } => "BackgroundProcessingResumed",
            ElementEvent::NonFatalError { .. } => "NonFatalError",
        }
    }
}

/// Central event distribution
///
/// Uses tokio::broadcast internally, so publishing never blocks and works
/// from plain threads without a runtime. Slow subscribers see `Lagged`.
///
/// # Examples
///
/// ```
/// use saymore_common::events::{ElementEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ElementEvent::ComponentFilesRefreshed {
///     id: "ETR007".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ElementEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ElementEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ElementEvent,
    ) -> Result<usize, broadcast::error::SendError<ElementEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ElementEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
