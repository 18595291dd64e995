//! Event emission system.
//!
//! The host platform pushes connectivity changes onto the bus; the state
//! container pushes its own changes so views can re-render. Each subscriber
//! has an independent buffer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

pub use voterlink_types::events::{Event, EventType};

/// Default per-subscriber buffer.
pub const DEFAULT_CAPACITY: usize = 256;

/// Coarse grouping of event types for subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Connectivity,
    Voters,
    Sync,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only pass these categories. `None` passes everything.
    pub categories: Option<Vec<EventCategory>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Emit an event stamped with the current time.
    pub fn emit_now(&self, event_type: EventType, payload: serde_json::Value) {
        self.emit(Event::new(event_type, voterlink_db::now_millis(), payload));
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventFilter {
    pub fn only(categories: &[EventCategory]) -> Self {
        Self {
            categories: Some(categories.to_vec()),
        }
    }

    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        match self.categories {
            Some(ref categories) => categories.contains(&categorize_event(event.event_type)),
            None => true,
        }
    }
}

/// Categorize an event type.
pub fn categorize_event(event_type: EventType) -> EventCategory {
    match event_type {
        EventType::Online | EventType::Offline | EventType::ConnectivityChanged => {
            EventCategory::Connectivity
        }
        EventType::SyncCompleted => EventCategory::Sync,
        EventType::VotersLoaded
        | EventType::VoterAdded
        | EventType::VoterUpdated
        | EventType::VoterDeleted
        | EventType::CurrentVoterChanged => EventCategory::Voters,
    }
}
