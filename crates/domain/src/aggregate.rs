//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::{EventId, Version};
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// Stored alongside the serialized payload in the outbox.
    fn event_type(&self) -> &'static str;

    /// Returns the unique id of this event occurrence.
    fn event_id(&self) -> EventId;

    /// Returns when the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Trait for aggregates whose state is persisted and whose transitions raise events.
///
/// An aggregate:
/// - Enforces its invariants through its own operations only
/// - Appends a domain event for every successful state transition
/// - Hands its pending events over exactly once, when the unit of work
///   that persists it captures them into the outbox
pub trait Aggregate: Send + Sync {
    /// The type of events this aggregate raises.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    ///
    /// Used to label outbox rows and concurrency errors.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's identifier rendered as a string.
    fn aggregate_id(&self) -> String;

    /// Returns the version the aggregate was loaded at.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the store after a successful commit.
    fn set_version(&mut self, version: Version);

    /// Returns events raised since the last capture.
    ///
    /// Aggregates that never raise events keep the default empty list.
    fn pending_events(&self) -> &[Self::Event] {
        &[]
    }

    /// Drains the pending events, leaving the list empty.
    fn take_events(&mut self) -> Vec<Self::Event> {
        Vec::new()
    }

    /// Returns true if the aggregate has events waiting to be captured.
    fn has_pending_events(&self) -> bool {
        !self.pending_events().is_empty()
    }
}
