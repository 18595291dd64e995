//! Event types for state-to-UI notification.
//!
//! Events travel over the application's event bus. Connectivity events are
//! produced by the host platform; the rest are produced by the state
//! container after it changes.

use serde::{Deserialize, Serialize};

use crate::Millis;

/// Envelope for all application events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: Millis,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(event_type: EventType, timestamp: Millis, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            timestamp,
            payload,
        }
    }
}

/// All event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Connectivity, emitted by the host
    Online,
    Offline,

    // State container
    ConnectivityChanged,
    VotersLoaded,
    VoterAdded,
    VoterUpdated,
    VoterDeleted,
    CurrentVoterChanged,
    SyncCompleted,
}
