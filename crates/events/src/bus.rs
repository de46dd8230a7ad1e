//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application. Events
//! are published only after the database transaction that caused them has
//! committed, so subscribers never observe rolled-back state.

use casebook_core::composite::CompositeKind;
use casebook_core::types::{DbId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event type published whenever a composite gains a new snapshot.
pub const EVENT_VERSION_CREATED: &str = "composite.version_created";

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A domain event, built with [`PlatformEvent::new`] and the `with_*` methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"composite.version_created"`.
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// VersionCreated
// ---------------------------------------------------------------------------

/// Payload of an [`EVENT_VERSION_CREATED`] event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCreated {
    pub kind: CompositeKind,
    pub parent_id: DbId,
    pub version: String,
}

impl VersionCreated {
    pub fn into_event(self, actor: DbId) -> PlatformEvent {
        let entity = self.kind.parent_entity();
        let parent_id = self.parent_id;
        let payload = serde_json::to_value(&self).unwrap_or_default();
        PlatformEvent::new(EVENT_VERSION_CREATED)
            .with_source(entity, parent_id)
            .with_actor(actor)
            .with_payload(payload)
    }

    /// Extract the payload, or `None` if `event` is some other type.
    pub fn from_event(event: &PlatformEvent) -> Option<Self> {
        if event.event_type != EVENT_VERSION_CREATED {
            return None;
        }
        serde_json::from_value(event.payload.clone()).ok()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// When the buffer is full the oldest unconsumed messages are dropped and
/// slow receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently if there are none.
    pub fn publish(&self, event: PlatformEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
