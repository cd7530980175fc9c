use chrono::{DateTime, Utc};
use common::EventId;
use domain::{Aggregate, DomainEvent};

use crate::Result;

/// A domain event staged for delivery to the external bus.
///
/// Written in the same unit of work as the aggregate that raised it.
/// `processed_on_utc` is `None` while the event is pending and is set once,
/// when the relay has published it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    pub event_id: EventId,
    /// Insertion order assigned by the store; zero until committed.
    pub position: i64,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: String,
    /// The serialized event, tagged with its variant.
    pub content: serde_json::Value,
    pub occurred_on_utc: DateTime<Utc>,
    pub processed_on_utc: Option<DateTime<Utc>>,
}

impl OutboxRecord {
    /// Stages one event raised by `aggregate`.
    pub fn capture<A: Aggregate>(aggregate: &A, event: &A::Event) -> Result<Self> {
        Ok(Self {
            event_id: event.event_id(),
            position: 0,
            event_type: event.event_type().to_string(),
            aggregate_type: A::aggregate_type().to_string(),
            aggregate_id: aggregate.aggregate_id(),
            content: serde_json::to_value(event)?,
            occurred_on_utc: event.occurred_at(),
            processed_on_utc: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.processed_on_utc.is_none()
    }

    /// Deserializes the content back into the concrete event.
    pub fn to_event<E: DomainEvent>(&self) -> Result<E> {
        Ok(serde_json::from_value(self.content.clone())?)
    }
}
