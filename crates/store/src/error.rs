use common::Version;
use thiserror::Error;

/// Errors that can occur when interacting with the delivery store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version did not match the version the unit of work was
    /// built from. Another writer got there first.
    #[error(
        "Concurrency conflict for {aggregate_type} {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_type: &'static str,
        aggregate_id: String,
        expected: Version,
        actual: Version,
    },

    /// An insert targeted an id that already exists.
    #[error("{aggregate_type} {aggregate_id} already exists")]
    DuplicateAggregate {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// An update or mark targeted a row that does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A persisted row could not be turned back into a domain value.
    #[error("Corrupt {table} row: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for faults of the store itself, as opposed to a
    /// conflict about one item. Batches abort on these.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::Migration(_))
    }

    /// Returns true if the error means the unit of work lost a race.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::ConcurrencyConflict { .. } | StoreError::DuplicateAggregate { .. }
        )
    }

    pub(crate) fn corrupt(table: &'static str, reason: impl ToString) -> Self {
        StoreError::CorruptRow {
            table,
            reason: reason.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
