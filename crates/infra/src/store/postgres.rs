//! Postgres-backed store.
//!
//! Every `StoreTx` wraps one database transaction. The order row and every
//! touched stock row are locked with `SELECT ... FOR UPDATE` for the lifetime
//! of the transaction, so concurrent transitions over the same rows serialize
//! on the database rather than in process.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database | `40001` | `Conflict` | Serialization failure |
//! | Database | `40P01` | `Conflict` | Deadlock detected |
//! | Database | `55P03` | `Conflict` | Lock not available |
//! | Database | `23505` | `Conflict` | Racing insert of the same key |
//! | Database | `23514`, `23503`, `23502` | `Constraint` | Check / foreign key / not-null |
//! | Database | Any other | `Database` | Other database errors |
//! | PoolTimedOut, PoolClosed, Io, Tls | N/A | `Unavailable` | Store unreachable |
//! | RowNotFound, ColumnDecode, Decode | N/A | `Corrupt` | Unexpected row shape |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use stockflow_core::{
    CounterpartyId, LineItem, MovementId, Order, OrderId, OrderKind, OrderStatus, ProductId,
};
use stockflow_inventory::{Direction, MovementKind, OrderRef, StockEntry, StockMovement};

use super::{Store, StoreTx};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

const SCHEMA: &str = include_str!("schema.sql");

const ORDER_COLUMNS: &str = "id, counterparty_id, total_amount, status, created_at, updated_at";
const MOVEMENT_COLUMNS: &str =
    "id, product_id, kind, direction, quantity, description, order_kind, order_id, movement_date";

/// Header and line-item tables of one order kind.
fn order_tables(kind: OrderKind) -> (&'static str, &'static str) {
    match kind {
        OrderKind::Client => ("client_orders", "client_order_lines"),
        OrderKind::Purchase => ("purchase_orders", "purchase_order_lines"),
    }
}

/// Postgres-backed transactional store.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool sized and timed from `config`.
    #[instrument(skip(config), fields(max_connections = config.max_connections), err)]
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not set".to_string()))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

/// Transaction handle of [`PostgresStore`]. Dropping it rolls back.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTx {
    async fn insert_lines(
        &mut self,
        table: &str,
        id: OrderId,
        lines: &[LineItem],
    ) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {table} (order_id, line_no, product_id, quantity, unit_price) \
             VALUES ($1, $2, $3, $4, $5)"
        );
        for (line_no, line) in lines.iter().enumerate() {
            let line_no = i32::try_from(line_no)
                .map_err(|_| StoreError::Constraint("too many line items".to_string()))?;
            sqlx::query(&sql)
                .bind(id.as_uuid())
                .bind(line_no)
                .bind(line.product_id.as_uuid())
                .bind(line.quantity)
                .bind(line.unit_price)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("insert_lines", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTx for PostgresTx {
    #[instrument(skip(self), fields(operation = "lock_order", order_id = %id), err)]
    async fn lock_order<S: OrderStatus>(&mut self, id: OrderId) -> StoreResult<Option<Order<S>>> {
        let (orders, _) = order_tables(S::KIND);
        let sql = format!("SELECT {ORDER_COLUMNS} FROM {orders} WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_order", e))?;
        row.map(|r| decode::<OrderRecord>(&r)?.into_order::<S>())
            .transpose()
    }

    #[instrument(
        skip(self, order, lines),
        fields(operation = "insert_order", order_id = %order.id),
        err
    )]
    async fn insert_order<S: OrderStatus>(
        &mut self,
        order: &Order<S>,
        lines: &[LineItem],
    ) -> StoreResult<()> {
        let (orders, order_lines) = order_tables(S::KIND);
        let sql = format!(
            "INSERT INTO {orders} ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        );
        sqlx::query(&sql)
            .bind(order.id.as_uuid())
            .bind(order.counterparty_id.as_uuid())
            .bind(order.total_amount)
            .bind(order.status.as_str())
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order", e))?;
        self.insert_lines(order_lines, order.id, lines).await
    }

    #[instrument(skip(self, order), fields(operation = "update_order", order_id = %order.id), err)]
    async fn update_order<S: OrderStatus>(&mut self, order: &Order<S>) -> StoreResult<()> {
        let (orders, _) = order_tables(S::KIND);
        let sql = format!(
            "UPDATE {orders} \
             SET counterparty_id = $2, total_amount = $3, status = $4, updated_at = $5 \
             WHERE id = $1"
        );
        let result = sqlx::query(&sql)
            .bind(order.id.as_uuid())
            .bind(order.counterparty_id.as_uuid())
            .bind(order.total_amount)
            .bind(order.status.as_str())
            .bind(order.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_order", e))?;
        if result.rows_affected() != 1 {
            return Err(StoreError::Database(format!(
                "update of missing {} order {}",
                S::KIND,
                order.id
            )));
        }
        Ok(())
    }

    async fn load_line_items(
        &mut self,
        kind: OrderKind,
        id: OrderId,
    ) -> StoreResult<Vec<LineItem>> {
        let (_, order_lines) = order_tables(kind);
        let sql = format!(
            "SELECT product_id, quantity, unit_price FROM {order_lines} \
             WHERE order_id = $1 ORDER BY line_no"
        );
        let rows = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("load_line_items", e))?;
        rows.iter().map(decode_line).collect()
    }

    #[instrument(
        skip(self, lines),
        fields(operation = "replace_line_items", order_id = %id, lines = lines.len()),
        err
    )]
    async fn replace_line_items(
        &mut self,
        kind: OrderKind,
        id: OrderId,
        lines: &[LineItem],
    ) -> StoreResult<()> {
        let (_, order_lines) = order_tables(kind);
        sqlx::query(&format!("DELETE FROM {order_lines} WHERE order_id = $1"))
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("replace_line_items", e))?;
        self.insert_lines(order_lines, id, lines).await
    }

    #[instrument(skip(self), fields(operation = "delete_order"), err)]
    async fn delete_order(&mut self, kind: OrderKind, id: OrderId) -> StoreResult<()> {
        let (orders, order_lines) = order_tables(kind);
        for table_sql in [
            format!("DELETE FROM {order_lines} WHERE order_id = $1"),
            format!("DELETE FROM {orders} WHERE id = $1"),
        ] {
            sqlx::query(&table_sql)
                .bind(id.as_uuid())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("delete_order", e))?;
        }
        Ok(())
    }

    #[instrument(skip(self, now), fields(operation = "lock_stock", product_id = %product_id), err)]
    async fn lock_stock(
        &mut self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> StoreResult<StockEntry> {
        sqlx::query(
            "INSERT INTO stock (product_id, quantity, updated_at) VALUES ($1, 0, $2) \
             ON CONFLICT (product_id) DO NOTHING",
        )
        .bind(product_id.as_uuid())
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_stock", e))?;

        let row = sqlx::query(
            "SELECT product_id, quantity, updated_at FROM stock WHERE product_id = $1 FOR UPDATE",
        )
        .bind(product_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_stock", e))?;
        Ok(decode::<StockRecord>(&row)?.into())
    }

    async fn write_stock(&mut self, entry: &StockEntry) -> StoreResult<()> {
        sqlx::query("UPDATE stock SET quantity = $2, updated_at = $3 WHERE product_id = $1")
            .bind(entry.product_id.as_uuid())
            .bind(entry.quantity)
            .bind(entry.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("write_stock", e))?;
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &StockMovement) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO stock_movements ({MOVEMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        );
        sqlx::query(&sql)
            .bind(movement.id.as_uuid())
            .bind(movement.product_id.as_uuid())
            .bind(movement.kind.as_str())
            .bind(movement.direction.as_str())
            .bind(movement.quantity)
            .bind(movement.description.as_deref())
            .bind(movement.origin.map(|o| o.kind.as_str()))
            .bind(movement.origin.map(|o| *o.order_id.as_uuid()))
            .bind(movement.movement_date)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_movement", e))?;
        Ok(())
    }

    async fn movements_for_order(&mut self, origin: OrderRef) -> StoreResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE order_kind = $1 AND order_id = $2 ORDER BY movement_date, id"
        );
        let rows = sqlx::query(&sql)
            .bind(origin.kind.as_str())
            .bind(origin.order_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("movements_for_order", e))?;
        decode_movements(&rows)
    }

    #[instrument(
        skip(self),
        fields(operation = "delete_movements_for_order", origin = %origin),
        err
    )]
    async fn delete_movements_for_order(&mut self, origin: OrderRef) -> StoreResult<u64> {
        let result =
            sqlx::query("DELETE FROM stock_movements WHERE order_kind = $1 AND order_id = $2")
                .bind(origin.kind.as_str())
                .bind(origin.order_id.as_uuid())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("delete_movements_for_order", e))?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> StoreResult<PostgresTx> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(PostgresTx { tx })
    }

    #[instrument(skip(self), fields(operation = "find_order", order_id = %id), err)]
    async fn find_order<S: OrderStatus>(&self, id: OrderId) -> StoreResult<Option<Order<S>>> {
        let (orders, _) = order_tables(S::KIND);
        let sql = format!("SELECT {ORDER_COLUMNS} FROM {orders} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_order", e))?;
        row.map(|r| decode::<OrderRecord>(&r)?.into_order::<S>())
            .transpose()
    }

    async fn list_orders<S: OrderStatus>(&self) -> StoreResult<Vec<Order<S>>> {
        let (orders, _) = order_tables(S::KIND);
        let sql = format!("SELECT {ORDER_COLUMNS} FROM {orders} ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;
        rows.iter()
            .map(|r| decode::<OrderRecord>(r)?.into_order::<S>())
            .collect()
    }

    async fn line_items(&self, kind: OrderKind, id: OrderId) -> StoreResult<Vec<LineItem>> {
        let (_, order_lines) = order_tables(kind);
        let sql = format!(
            "SELECT product_id, quantity, unit_price FROM {order_lines} \
             WHERE order_id = $1 ORDER BY line_no"
        );
        let rows = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("line_items", e))?;
        rows.iter().map(decode_line).collect()
    }

    async fn order_status_counts<S: OrderStatus>(&self) -> StoreResult<Vec<(S, u64)>> {
        let (orders, _) = order_tables(S::KIND);
        let sql = format!("SELECT status, COUNT(*) AS n FROM {orders} GROUP BY status");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("order_status_counts", e))?;
        rows.iter()
            .map(|row| {
                let status: String = row
                    .try_get("status")
                    .map_err(|e| map_sqlx_error("order_status_counts", e))?;
                let n: i64 = row
                    .try_get("n")
                    .map_err(|e| map_sqlx_error("order_status_counts", e))?;
                let status = S::parse(&status).map_err(|e| StoreError::corrupt(e.to_string()))?;
                Ok((status, count(n)))
            })
            .collect()
    }

    async fn stock_entry(&self, product_id: ProductId) -> StoreResult<Option<StockEntry>> {
        let row = sqlx::query(
            "SELECT product_id, quantity, updated_at FROM stock WHERE product_id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_entry", e))?;
        row.map(|r| decode::<StockRecord>(&r).map(StockEntry::from))
            .transpose()
    }

    async fn stock_levels(&self, at_most: Option<i64>) -> StoreResult<Vec<StockEntry>> {
        let rows = match at_most {
            None => {
                sqlx::query(
                    "SELECT product_id, quantity, updated_at FROM stock ORDER BY product_id",
                )
                .fetch_all(&*self.pool)
                .await
            }
            Some(threshold) => {
                sqlx::query(
                    "SELECT product_id, quantity, updated_at FROM stock \
                     WHERE quantity <= $1 ORDER BY quantity, product_id",
                )
                .bind(threshold)
                .fetch_all(&*self.pool)
                .await
            }
        }
        .map_err(|e| map_sqlx_error("stock_levels", e))?;
        rows.iter()
            .map(|r| decode::<StockRecord>(r).map(StockEntry::from))
            .collect()
    }

    async fn out_of_stock_count(&self) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock WHERE quantity = 0")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("out_of_stock_count", e))?;
        Ok(count(n))
    }

    async fn recent_movements(&self, limit: usize) -> StoreResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             ORDER BY movement_date DESC, id DESC LIMIT $1"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("recent_movements", e))?;
        decode_movements(&rows)
    }

    async fn movement(&self, id: MovementId) -> StoreResult<Option<StockMovement>> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("movement", e))?;
        row.map(|r| decode::<MovementRecord>(&r)?.into_movement())
            .transpose()
    }

    async fn movements_for_product(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE product_id = $1 ORDER BY movement_date DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(product_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("movements_for_product", e))?;
        decode_movements(&rows)
    }

    async fn movement_counts(&self) -> StoreResult<Vec<(MovementKind, u64)>> {
        let rows = sqlx::query(
            "SELECT kind, COUNT(*) AS n FROM stock_movements GROUP BY kind ORDER BY kind",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movement_counts", e))?;
        rows.iter()
            .map(|row| {
                let kind: String = row
                    .try_get("kind")
                    .map_err(|e| map_sqlx_error("movement_counts", e))?;
                let n: i64 = row
                    .try_get("n")
                    .map_err(|e| map_sqlx_error("movement_counts", e))?;
                let kind = MovementKind::parse(&kind)
                    .map_err(|e| StoreError::corrupt(e.to_string()))?;
                Ok((kind, count(n)))
            })
            .collect()
    }
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Map SQLx errors to `StoreError`, keyed on SQLSTATE where there is one.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // serialization failure, deadlock, lock not available, unique violation
                Some("40001") | Some("40P01") | Some("55P03") | Some("23505") => {
                    StoreError::Conflict(msg)
                }
                Some("23514") | Some("23503") | Some("23502") => StoreError::Constraint(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => {
            StoreError::Unavailable(format!("tls error in {}: {}", operation, e))
        }
        sqlx::Error::RowNotFound => {
            StoreError::Corrupt(format!("unexpected row not found in {}", operation))
        }
        err @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
            StoreError::Corrupt(format!("failed to decode row in {}: {}", operation, err))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode<T>(row: &PgRow) -> StoreResult<T>
where
    T: for<'r> FromRow<'r, PgRow>,
{
    T::from_row(row).map_err(|e| StoreError::corrupt(format!("failed to decode row: {}", e)))
}

fn decode_line(row: &PgRow) -> StoreResult<LineItem> {
    let product_id: Uuid = row
        .try_get("product_id")
        .map_err(|e| map_sqlx_error("decode_line", e))?;
    Ok(LineItem {
        product_id: ProductId::from_uuid(product_id),
        quantity: row.try_get("quantity").map_err(|e| map_sqlx_error("decode_line", e))?,
        unit_price: row.try_get("unit_price").map_err(|e| map_sqlx_error("decode_line", e))?,
    })
}

fn decode_movements(rows: &[PgRow]) -> StoreResult<Vec<StockMovement>> {
    rows.iter()
        .map(|r| decode::<MovementRecord>(r)?.into_movement())
        .collect()
}

// SQLx row types

struct OrderRecord {
    id: Uuid,
    counterparty_id: Uuid,
    total_amount: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OrderRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRecord {
            id: row.try_get("id")?,
            counterparty_id: row.try_get("counterparty_id")?,
            total_amount: row.try_get("total_amount")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl OrderRecord {
    fn into_order<S: OrderStatus>(self) -> StoreResult<Order<S>> {
        let status = S::parse(&self.status).map_err(|e| StoreError::corrupt(e.to_string()))?;
        Ok(Order {
            id: OrderId::from_uuid(self.id),
            counterparty_id: CounterpartyId::from_uuid(self.counterparty_id),
            total_amount: self.total_amount,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

struct StockRecord {
    product_id: Uuid,
    quantity: i64,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for StockRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockRecord {
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<StockRecord> for StockEntry {
    fn from(record: StockRecord) -> Self {
        StockEntry {
            product_id: ProductId::from_uuid(record.product_id),
            quantity: record.quantity,
            updated_at: record.updated_at,
        }
    }
}

struct MovementRecord {
    id: Uuid,
    product_id: Uuid,
    kind: String,
    direction: String,
    quantity: i64,
    description: Option<String>,
    order_kind: Option<String>,
    order_id: Option<Uuid>,
    movement_date: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for MovementRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRecord {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            kind: row.try_get("kind")?,
            direction: row.try_get("direction")?,
            quantity: row.try_get("quantity")?,
            description: row.try_get("description")?,
            order_kind: row.try_get("order_kind")?,
            order_id: row.try_get("order_id")?,
            movement_date: row.try_get("movement_date")?,
        })
    }
}

impl MovementRecord {
    fn into_movement(self) -> StoreResult<StockMovement> {
        let corrupt = |e: stockflow_core::DomainError| StoreError::corrupt(e.to_string());
        let origin = match (self.order_kind, self.order_id) {
            (Some(kind), Some(order_id)) => Some(OrderRef::new(
                OrderKind::parse(&kind).map_err(corrupt)?,
                OrderId::from_uuid(order_id),
            )),
            _ => None,
        };
        Ok(StockMovement {
            id: MovementId::from_uuid(self.id),
            product_id: ProductId::from_uuid(self.product_id),
            kind: MovementKind::parse(&self.kind).map_err(corrupt)?,
            direction: Direction::parse(&self.direction).map_err(corrupt)?,
            quantity: self.quantity,
            description: self.description,
            origin,
            movement_date: self.movement_date,
        })
    }
}
