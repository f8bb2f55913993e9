//! Transactional relational store abstraction.
//!
//! A [`Store`] hands out [`StoreTx`] atomic units and answers read-only
//! queries. Everything that mutates orders, stock or movements goes through a
//! `StoreTx`; dropping a `StoreTx` without calling [`StoreTx::commit`] rolls it
//! back.
//!
//! Two implementations:
//! - [`InMemoryStore`] for tests/dev
//! - [`PostgresStore`] for production (row locks via `SELECT ... FOR UPDATE`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockflow_core::{
    LineItem, MovementId, Order, OrderId, OrderKind, OrderStatus, ProductId,
};
use stockflow_inventory::{MovementKind, OrderRef, StockEntry, StockMovement};

use crate::error::StoreResult;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// One atomic unit of work.
///
/// Row-level locks acquired through `lock_*` are held until commit or rollback.
#[async_trait]
pub trait StoreTx: Send + Sized {
    /// Load and lock an order header. `None` if it does not exist.
    async fn lock_order<S: OrderStatus>(&mut self, id: OrderId) -> StoreResult<Option<Order<S>>>;

    /// Insert a header together with its line items.
    async fn insert_order<S: OrderStatus>(
        &mut self,
        order: &Order<S>,
        lines: &[LineItem],
    ) -> StoreResult<()>;

    /// Overwrite counterparty, total, status and `updated_at` of an existing header.
    async fn update_order<S: OrderStatus>(&mut self, order: &Order<S>) -> StoreResult<()>;

    async fn load_line_items(&mut self, kind: OrderKind, id: OrderId) -> StoreResult<Vec<LineItem>>;

    /// Delete every line item of the order, then insert `lines` in order.
    async fn replace_line_items(
        &mut self,
        kind: OrderKind,
        id: OrderId,
        lines: &[LineItem],
    ) -> StoreResult<()>;

    /// Delete the line items and then the header.
    async fn delete_order(&mut self, kind: OrderKind, id: OrderId) -> StoreResult<()>;

    /// Load and lock the stock row of a product, creating it at zero if missing.
    ///
    /// A row created here only survives if the unit commits.
    async fn lock_stock(&mut self, product_id: ProductId, now: DateTime<Utc>)
    -> StoreResult<StockEntry>;

    async fn write_stock(&mut self, entry: &StockEntry) -> StoreResult<()>;

    async fn insert_movement(&mut self, movement: &StockMovement) -> StoreResult<()>;

    async fn movements_for_order(&mut self, origin: OrderRef) -> StoreResult<Vec<StockMovement>>;

    /// Returns the number of removed rows.
    async fn delete_movements_for_order(&mut self, origin: OrderRef) -> StoreResult<u64>;

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

/// Transactional store plus read-only reporting queries.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: StoreTx;

    async fn begin(&self) -> StoreResult<Self::Tx>;

    async fn find_order<S: OrderStatus>(&self, id: OrderId) -> StoreResult<Option<Order<S>>>;

    /// All headers of one kind, newest first.
    async fn list_orders<S: OrderStatus>(&self) -> StoreResult<Vec<Order<S>>>;

    async fn line_items(&self, kind: OrderKind, id: OrderId) -> StoreResult<Vec<LineItem>>;

    /// Number of orders per status. Statuses without orders are omitted.
    async fn order_status_counts<S: OrderStatus>(&self) -> StoreResult<Vec<(S, u64)>>;

    async fn stock_entry(&self, product_id: ProductId) -> StoreResult<Option<StockEntry>>;

    /// Stock rows in ascending product order, or only those with
    /// `quantity <= at_most` (lowest first) when a threshold is given.
    async fn stock_levels(&self, at_most: Option<i64>) -> StoreResult<Vec<StockEntry>>;

    async fn out_of_stock_count(&self) -> StoreResult<u64>;

    async fn movement(&self, id: MovementId) -> StoreResult<Option<StockMovement>>;

    /// Most recent movements, newest first.
    async fn recent_movements(&self, limit: usize) -> StoreResult<Vec<StockMovement>>;

    /// Movements of one product, newest first.
    async fn movements_for_product(&self, product_id: ProductId)
    -> StoreResult<Vec<StockMovement>>;

    /// Number of movements per kind. Kinds without movements are omitted.
    async fn movement_counts(&self) -> StoreResult<Vec<(MovementKind, u64)>>;
}
