use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CourierId, EventId, OrderId, Version};
use domain::{Courier, CourierStatus, Location, Order, OrderStatus, Transport};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Change, ChangeKind, OutboxRecord, Result, StoreError, UnitOfWork, store::DeliveryStore,
};

const COURIER_COLUMNS: &str = "id, name, transport_id, location_x, location_y, status, version";
const ORDER_COLUMNS: &str = "id, location_x, location_y, status, courier_id, version";
const OUTBOX_COLUMNS: &str = "event_id, position, type, aggregate_type, aggregate_id, content, \
     occurred_on_utc, processed_on_utc";

/// PostgreSQL-backed delivery store.
#[derive(Clone)]
pub struct PostgresDeliveryStore {
    pool: PgPool,
}

impl PostgresDeliveryStore {
    /// Creates a new PostgreSQL delivery store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_location(table: &'static str, row: &PgRow) -> Result<Location> {
        let x: i32 = row.try_get("location_x")?;
        let y: i32 = row.try_get("location_y")?;
        Location::new(x, y).map_err(|e| StoreError::corrupt(table, e))
    }

    fn row_to_courier(row: PgRow) -> Result<Courier> {
        let transport_id: i32 = row.try_get("transport_id")?;
        let transport =
            Transport::from_id(transport_id).map_err(|e| StoreError::corrupt("couriers", e))?;
        let status: String = row.try_get("status")?;
        let status = CourierStatus::parse(&status).ok_or_else(|| {
            StoreError::corrupt("couriers", format!("unknown status '{status}'"))
        })?;

        Ok(Courier::restore(
            CourierId::from_uuid(row.try_get::<Uuid, _>("id")?),
            row.try_get("name")?,
            transport,
            Self::row_to_location("couriers", &row)?,
            status,
            Version::new(row.try_get("version")?),
        ))
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let id: String = row.try_get("id")?;
        let id = OrderId::new(id).map_err(|e| StoreError::corrupt("orders", e))?;
        let status: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status)
            .ok_or_else(|| StoreError::corrupt("orders", format!("unknown status '{status}'")))?;
        let courier_id: Option<Uuid> = row.try_get("courier_id")?;

        Ok(Order::restore(
            id,
            Self::row_to_location("orders", &row)?,
            status,
            courier_id.map(CourierId::from_uuid),
            Version::new(row.try_get("version")?),
        ))
    }

    fn row_to_outbox(row: PgRow) -> Result<OutboxRecord> {
        Ok(OutboxRecord {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            position: row.try_get("position")?,
            event_type: row.try_get("type")?,
            aggregate_type: row.try_get("aggregate_type")?,
            aggregate_id: row.try_get("aggregate_id")?,
            content: row.try_get("content")?,
            occurred_on_utc: row.try_get("occurred_on_utc")?,
            processed_on_utc: row.try_get("processed_on_utc")?,
        })
    }

    async fn fetch_couriers(&self, filter: &str, status: Option<&str>) -> Result<Vec<Courier>> {
        let sql = format!("SELECT {COURIER_COLUMNS} FROM couriers {filter} ORDER BY seq ASC");
        let rows = sqlx::query(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_courier).collect()
    }

    async fn fetch_orders(&self, filter: &str, statuses: &[&str]) -> Result<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders {filter} ORDER BY seq ASC");
        let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
        let rows = sqlx::query(&sql)
            .bind(statuses)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    /// Reads the stored version inside the transaction, used to explain why
    /// a conditional write touched no rows.
    async fn stored_version(
        tx: &mut Transaction<'_, Postgres>,
        change: &Change,
    ) -> Result<Option<Version>> {
        let version: Option<i64> = match change {
            Change::Courier(_, courier) => {
                sqlx::query_scalar("SELECT version FROM couriers WHERE id = $1")
                    .bind(courier.id().as_uuid())
                    .fetch_optional(&mut **tx)
                    .await?
            }
            Change::Order(_, order) => {
                sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                    .bind(order.id().as_str())
                    .fetch_optional(&mut **tx)
                    .await?
            }
        };
        Ok(version.map(Version::new))
    }

    async fn write_change(tx: &mut Transaction<'_, Postgres>, change: &Change) -> Result<()> {
        let expected = change.expected_version();
        let next = expected.next();

        let result = match change {
            Change::Courier(ChangeKind::Insert, courier) => {
                sqlx::query(
                    r#"
                    INSERT INTO couriers (id, name, transport_id, location_x, location_y, status, version)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(courier.id().as_uuid())
                .bind(courier.name())
                .bind(courier.transport().id())
                .bind(courier.location().x())
                .bind(courier.location().y())
                .bind(courier.status().as_str())
                .bind(next.as_i64())
                .execute(&mut **tx)
                .await?
            }
            Change::Courier(ChangeKind::Update, courier) => {
                sqlx::query(
                    r#"
                    UPDATE couriers
                    SET name = $2, transport_id = $3, location_x = $4, location_y = $5,
                        status = $6, version = $7
                    WHERE id = $1 AND version = $8
                    "#,
                )
                .bind(courier.id().as_uuid())
                .bind(courier.name())
                .bind(courier.transport().id())
                .bind(courier.location().x())
                .bind(courier.location().y())
                .bind(courier.status().as_str())
                .bind(next.as_i64())
                .bind(expected.as_i64())
                .execute(&mut **tx)
                .await?
            }
            Change::Order(ChangeKind::Insert, order) => {
                sqlx::query(
                    r#"
                    INSERT INTO orders (id, location_x, location_y, status, courier_id, version)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(order.id().as_str())
                .bind(order.location().x())
                .bind(order.location().y())
                .bind(order.status().as_str())
                .bind(order.courier_id().map(|id| id.as_uuid()))
                .bind(next.as_i64())
                .execute(&mut **tx)
                .await?
            }
            Change::Order(ChangeKind::Update, order) => {
                sqlx::query(
                    r#"
                    UPDATE orders
                    SET location_x = $2, location_y = $3, status = $4, courier_id = $5,
                        version = $6
                    WHERE id = $1 AND version = $7
                    "#,
                )
                .bind(order.id().as_str())
                .bind(order.location().x())
                .bind(order.location().y())
                .bind(order.status().as_str())
                .bind(order.courier_id().map(|id| id.as_uuid()))
                .bind(next.as_i64())
                .bind(expected.as_i64())
                .execute(&mut **tx)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            // The conditional write lost; turn the stored state into the matching error.
            let current = Self::stored_version(tx, change).await?;
            change.resolve(current)?;
        }
        Ok(())
    }

    async fn write_outbox(tx: &mut Transaction<'_, Postgres>, record: &OutboxRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO outbox (event_id, type, aggregate_type, aggregate_id, content, occurred_on_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.event_id.as_uuid())
        .bind(&record.event_type)
        .bind(&record.aggregate_type)
        .bind(&record.aggregate_id)
        .bind(&record.content)
        .bind(record.occurred_on_utc)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("outbox_pkey")
            {
                return StoreError::DuplicateAggregate {
                    aggregate_type: "OutboxRecord",
                    aggregate_id: record.event_id.to_string(),
                };
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryStore for PostgresDeliveryStore {
    async fn get_courier(&self, id: CourierId) -> Result<Option<Courier>> {
        let sql = format!("SELECT {COURIER_COLUMNS} FROM couriers WHERE id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_courier).transpose()
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn list_couriers(&self) -> Result<Vec<Courier>> {
        self.fetch_couriers("WHERE $1::TEXT IS NULL", None).await
    }

    async fn list_free_couriers(&self) -> Result<Vec<Courier>> {
        self.fetch_couriers("WHERE status = $1", Some(CourierStatus::Free.as_str()))
            .await
    }

    async fn list_busy_couriers(&self) -> Result<Vec<Courier>> {
        self.fetch_couriers("WHERE status = $1", Some(CourierStatus::Busy.as_str()))
            .await
    }

    async fn list_created_orders(&self) -> Result<Vec<Order>> {
        self.fetch_orders("WHERE status = ANY($1)", &[OrderStatus::Created.as_str()])
            .await
    }

    async fn list_assigned_orders(&self) -> Result<Vec<Order>> {
        self.fetch_orders("WHERE status = ANY($1)", &[OrderStatus::Assigned.as_str()])
            .await
    }

    async fn list_active_orders(&self) -> Result<Vec<Order>> {
        self.fetch_orders(
            "WHERE status = ANY($1)",
            &[OrderStatus::Created.as_str(), OrderStatus::Assigned.as_str()],
        )
        .await
    }

    #[tracing::instrument(
        skip_all,
        fields(
            changes = unit_of_work.changes().len(),
            events = unit_of_work.outbox().len()
        )
    )]
    async fn commit(&self, unit_of_work: UnitOfWork) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for change in unit_of_work.changes() {
            Self::write_change(&mut tx, change).await?;
        }
        for record in unit_of_work.outbox() {
            Self::write_outbox(&mut tx, record).await?;
        }

        tx.commit().await?;

        metrics::counter!("outbox_records_captured_total")
            .increment(unit_of_work.outbox().len() as u64);
        Ok(())
    }

    async fn pending_outbox_after(&self, after: i64, limit: usize) -> Result<Vec<OutboxRecord>> {
        let sql = format!(
            "SELECT {OUTBOX_COLUMNS} FROM outbox \
             WHERE processed_on_utc IS NULL AND position > $1 \
             ORDER BY position ASC LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(after)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_outbox).collect()
    }

    async fn mark_processed(&self, event_id: EventId, processed_at: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE outbox SET processed_on_utc = $2 WHERE event_id = $1 AND processed_on_utc IS NULL",
        )
        .bind(event_id.as_uuid())
        .bind(processed_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<Uuid> =
                sqlx::query_scalar("SELECT event_id FROM outbox WHERE event_id = $1")
                    .bind(event_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_none() {
                return Err(StoreError::NotFound {
                    kind: "OutboxRecord",
                    id: event_id.to_string(),
                });
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
