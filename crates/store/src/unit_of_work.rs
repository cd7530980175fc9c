use common::Version;
use domain::{Aggregate, Courier, Order};

use crate::{OutboxRecord, Result, StoreError};

/// Whether a change inserts a new aggregate or updates a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
}

/// One aggregate write staged in a [`UnitOfWork`].
#[derive(Debug, Clone)]
pub enum Change {
    Courier(ChangeKind, Courier),
    Order(ChangeKind, Order),
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Courier(kind, _) | Change::Order(kind, _) => *kind,
        }
    }

    pub fn aggregate_type(&self) -> &'static str {
        match self {
            Change::Courier(..) => Courier::aggregate_type(),
            Change::Order(..) => Order::aggregate_type(),
        }
    }

    pub fn aggregate_id(&self) -> String {
        match self {
            Change::Courier(_, courier) => courier.aggregate_id(),
            Change::Order(_, order) => order.aggregate_id(),
        }
    }

    /// The version the aggregate had when it was loaded.
    pub fn expected_version(&self) -> Version {
        match self {
            Change::Courier(_, courier) => courier.version(),
            Change::Order(_, order) => order.version(),
        }
    }

    /// Checks the change against the currently stored version (`None` if the
    /// aggregate does not exist) and returns the version it will be stored at.
    pub fn resolve(&self, current: Option<Version>) -> Result<Version> {
        let expected = self.expected_version();
        match (self.kind(), current) {
            (ChangeKind::Insert, None) => Ok(expected.next()),
            (ChangeKind::Insert, Some(_)) => Err(StoreError::DuplicateAggregate {
                aggregate_type: self.aggregate_type(),
                aggregate_id: self.aggregate_id(),
            }),
            (ChangeKind::Update, None) => Err(StoreError::NotFound {
                kind: self.aggregate_type(),
                id: self.aggregate_id(),
            }),
            (ChangeKind::Update, Some(actual)) if actual != expected => {
                Err(StoreError::ConcurrencyConflict {
                    aggregate_type: self.aggregate_type(),
                    aggregate_id: self.aggregate_id(),
                    expected,
                    actual,
                })
            }
            (ChangeKind::Update, Some(_)) => Ok(expected.next()),
        }
    }
}

/// An atomic batch of aggregate writes plus the events they raised.
///
/// Staging an aggregate drains its pending events into outbox records, so
/// the same events can never be captured twice. The store commits the
/// changes and the outbox records together or not at all.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    changes: Vec<Change>,
    outbox: Vec<OutboxRecord>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a courier that must not exist yet.
    pub fn add_courier(&mut self, courier: &mut Courier) -> Result<()> {
        self.capture_events(courier)?;
        self.changes
            .push(Change::Courier(ChangeKind::Insert, courier.clone()));
        Ok(())
    }

    /// Stages a courier update, checked against the loaded version.
    pub fn update_courier(&mut self, courier: &mut Courier) -> Result<()> {
        self.capture_events(courier)?;
        self.changes
            .push(Change::Courier(ChangeKind::Update, courier.clone()));
        Ok(())
    }

    /// Stages an order that must not exist yet.
    pub fn add_order(&mut self, order: &mut Order) -> Result<()> {
        self.capture_events(order)?;
        self.changes.push(Change::Order(ChangeKind::Insert, order.clone()));
        Ok(())
    }

    /// Stages an order update, checked against the loaded version.
    pub fn update_order(&mut self, order: &mut Order) -> Result<()> {
        self.capture_events(order)?;
        self.changes.push(Change::Order(ChangeKind::Update, order.clone()));
        Ok(())
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Outbox records in raise order.
    pub fn outbox(&self) -> &[OutboxRecord] {
        &self.outbox
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.outbox.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Change>, Vec<OutboxRecord>) {
        (self.changes, self.outbox)
    }

    fn capture_events<A: Aggregate>(&mut self, aggregate: &mut A) -> Result<()> {
        let records = {
            let aggregate: &A = aggregate;
            aggregate
                .pending_events()
                .iter()
                .map(|event| OutboxRecord::capture(aggregate, event))
                .collect::<Result<Vec<_>>>()?
        };
        // Only drop the events once every one of them serialized.
        aggregate.take_events();
        self.outbox.extend(records);
        Ok(())
    }
}
