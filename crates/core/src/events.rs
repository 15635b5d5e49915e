use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOutcome {
    Success,
    Degraded,
    Rejected,
}

/// Progress notification emitted by the interview runtime. Observers receive
/// these instead of UI callbacks; the state machine itself never depends on
/// who is listening.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewEvent {
    pub event_id: String,
    pub session_id: String,
    pub event_type: String,
    pub outcome: EventOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl InterviewEvent {
    pub fn new(
        session_id: impl Into<String>,
        event_type: impl Into<String>,
        outcome: EventOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            event_type: event_type.into(),
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: InterviewEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<Vec<InterviewEvent>>>,
}

impl InMemoryEventSink {
    pub fn events(&self) -> Vec<InterviewEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for InMemoryEventSink {
    fn emit(&self, event: InterviewEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Production sink: forwards events to the tracing subscriber as structured
/// fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: InterviewEvent) {
        tracing::info!(
            event_name = %event.event_type,
            session_id = %event.session_id,
            outcome = ?event.outcome,
            metadata = ?event.metadata,
            "interview event"
        );
    }
}
