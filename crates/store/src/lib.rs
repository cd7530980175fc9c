pub mod error;
pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod store;
pub mod unit_of_work;

pub use error::{Result, StoreError};
pub use memory::InMemoryDeliveryStore;
pub use outbox::OutboxRecord;
pub use postgres::PostgresDeliveryStore;
pub use store::{DeliveryStore, DeliveryStoreExt};
pub use unit_of_work::{Change, ChangeKind, UnitOfWork};
