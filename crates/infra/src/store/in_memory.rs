use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockflow_core::{
    CounterpartyId, LineItem, MovementId, Order, OrderId, OrderKind, OrderStatus, ProductId,
};
use stockflow_inventory::{MovementKind, OrderRef, StockEntry, StockMovement};

use super::{Store, StoreTx};
use crate::error::{StoreError, StoreResult};

type OrderKey = (OrderKind, OrderId);

/// Order header as stored: the status is kept in its textual form, like a
/// database column, and parsed on the way out.
#[derive(Debug, Clone)]
struct OrderRow {
    id: OrderId,
    counterparty_id: CounterpartyId,
    total_amount: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn from_order<S: OrderStatus>(order: &Order<S>) -> Self {
        Self {
            id: order.id,
            counterparty_id: order.counterparty_id,
            total_amount: order.total_amount,
            status: order.status.as_str().to_string(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }

    fn to_order<S: OrderStatus>(&self) -> StoreResult<Order<S>> {
        let status = S::parse(&self.status).map_err(|e| StoreError::corrupt(e.to_string()))?;
        Ok(Order {
            id: self.id,
            counterparty_id: self.counterparty_id,
            total_amount: self.total_amount,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: HashMap<OrderKey, OrderRow>,
    lines: HashMap<OrderKey, Vec<LineItem>>,
    stock: BTreeMap<ProductId, StockEntry>,
    movements: Vec<StockMovement>,
}

impl Tables {
    fn order<S: OrderStatus>(&self, id: OrderId) -> StoreResult<Option<Order<S>>> {
        self.orders
            .get(&(S::KIND, id))
            .map(OrderRow::to_order::<S>)
            .transpose()
    }
}

fn newest_first(movements: &mut [StockMovement]) {
    movements.sort_by(|a, b| {
        b.movement_date
            .cmp(&a.movement_date)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// In-memory transactional store.
///
/// Intended for tests/dev. Not optimized for performance.
///
/// A transaction holds the single table lock for its whole lifetime and works
/// on a private copy of the tables, so transactions are fully serialized and a
/// dropped transaction leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    transactions: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions begun so far.
    pub fn transactions_started(&self) -> u64 {
        self.transactions.load(Ordering::SeqCst)
    }
}

/// Transaction handle of [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn lock_order<S: OrderStatus>(&mut self, id: OrderId) -> StoreResult<Option<Order<S>>> {
        self.working.order::<S>(id)
    }

    async fn insert_order<S: OrderStatus>(
        &mut self,
        order: &Order<S>,
        lines: &[LineItem],
    ) -> StoreResult<()> {
        let key = (S::KIND, order.id);
        if self.working.orders.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "{} order {} already exists",
                S::KIND,
                order.id
            )));
        }
        self.working.orders.insert(key, OrderRow::from_order(order));
        self.working.lines.insert(key, lines.to_vec());
        Ok(())
    }

    async fn update_order<S: OrderStatus>(&mut self, order: &Order<S>) -> StoreResult<()> {
        match self.working.orders.get_mut(&(S::KIND, order.id)) {
            Some(row) => {
                *row = OrderRow::from_order(order);
                Ok(())
            }
            None => Err(StoreError::Database(format!(
                "update of missing {} order {}",
                S::KIND,
                order.id
            ))),
        }
    }

    async fn load_line_items(
        &mut self,
        kind: OrderKind,
        id: OrderId,
    ) -> StoreResult<Vec<LineItem>> {
        Ok(self.working.lines.get(&(kind, id)).cloned().unwrap_or_default())
    }

    async fn replace_line_items(
        &mut self,
        kind: OrderKind,
        id: OrderId,
        lines: &[LineItem],
    ) -> StoreResult<()> {
        self.working.lines.insert((kind, id), lines.to_vec());
        Ok(())
    }

    async fn delete_order(&mut self, kind: OrderKind, id: OrderId) -> StoreResult<()> {
        self.working.lines.remove(&(kind, id));
        self.working.orders.remove(&(kind, id));
        Ok(())
    }

    async fn lock_stock(
        &mut self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> StoreResult<StockEntry> {
        Ok(self
            .working
            .stock
            .entry(product_id)
            .or_insert_with(|| StockEntry::empty(product_id, now))
            .clone())
    }

    async fn write_stock(&mut self, entry: &StockEntry) -> StoreResult<()> {
        if entry.quantity < 0 {
            return Err(StoreError::Constraint(format!(
                "stock of product {} would become {}",
                entry.product_id, entry.quantity
            )));
        }
        self.working.stock.insert(entry.product_id, entry.clone());
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &StockMovement) -> StoreResult<()> {
        if self.working.movements.iter().any(|m| m.id == movement.id) {
            return Err(StoreError::Conflict(format!(
                "movement {} already exists",
                movement.id
            )));
        }
        self.working.movements.push(movement.clone());
        Ok(())
    }

    async fn movements_for_order(&mut self, origin: OrderRef) -> StoreResult<Vec<StockMovement>> {
        Ok(self
            .working
            .movements
            .iter()
            .filter(|m| m.origin == Some(origin))
            .cloned()
            .collect())
    }

    async fn delete_movements_for_order(&mut self, origin: OrderRef) -> StoreResult<u64> {
        let before = self.working.movements.len();
        self.working.movements.retain(|m| m.origin != Some(origin));
        Ok((before - self.working.movements.len()) as u64)
    }

    async fn commit(self) -> StoreResult<()> {
        let InMemoryTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> StoreResult<InMemoryTx> {
        let guard = self.tables.clone().lock_owned().await;
        self.transactions.fetch_add(1, Ordering::SeqCst);
        let working = Tables::clone(&guard);
        Ok(InMemoryTx { guard, working })
    }

    async fn find_order<S: OrderStatus>(&self, id: OrderId) -> StoreResult<Option<Order<S>>> {
        self.tables.lock().await.order::<S>(id)
    }

    async fn list_orders<S: OrderStatus>(&self) -> StoreResult<Vec<Order<S>>> {
        let tables = self.tables.lock().await;
        let mut orders = tables
            .orders
            .iter()
            .filter(|((kind, _), _)| *kind == S::KIND)
            .map(|(_, row)| row.to_order::<S>())
            .collect::<StoreResult<Vec<_>>>()?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn line_items(&self, kind: OrderKind, id: OrderId) -> StoreResult<Vec<LineItem>> {
        let tables = self.tables.lock().await;
        Ok(tables.lines.get(&(kind, id)).cloned().unwrap_or_default())
    }

    async fn order_status_counts<S: OrderStatus>(&self) -> StoreResult<Vec<(S, u64)>> {
        let tables = self.tables.lock().await;
        let mut counts: Vec<(S, u64)> = Vec::new();
        for ((kind, _), row) in &tables.orders {
            if *kind != S::KIND {
                continue;
            }
            let status = S::parse(&row.status).map_err(|e| StoreError::corrupt(e.to_string()))?;
            match counts.iter_mut().find(|(s, _)| *s == status) {
                Some((_, n)) => *n += 1,
                None => counts.push((status, 1)),
            }
        }
        Ok(counts)
    }

    async fn stock_entry(&self, product_id: ProductId) -> StoreResult<Option<StockEntry>> {
        Ok(self.tables.lock().await.stock.get(&product_id).cloned())
    }

    async fn stock_levels(&self, at_most: Option<i64>) -> StoreResult<Vec<StockEntry>> {
        let tables = self.tables.lock().await;
        let entries = tables.stock.values().cloned();
        Ok(match at_most {
            None => entries.collect(),
            Some(threshold) => {
                let mut low: Vec<_> = entries.filter(|e| e.quantity <= threshold).collect();
                low.sort_by_key(|e| (e.quantity, e.product_id));
                low
            }
        })
    }

    async fn out_of_stock_count(&self) -> StoreResult<u64> {
        let tables = self.tables.lock().await;
        Ok(tables.stock.values().filter(|e| e.is_out_of_stock()).count() as u64)
    }

    async fn movement(&self, id: MovementId) -> StoreResult<Option<StockMovement>> {
        let tables = self.tables.lock().await;
        Ok(tables.movements.iter().find(|m| m.id == id).cloned())
    }

    async fn recent_movements(&self, limit: usize) -> StoreResult<Vec<StockMovement>> {
        let mut movements = self.tables.lock().await.movements.clone();
        newest_first(&mut movements);
        movements.truncate(limit);
        Ok(movements)
    }

    async fn movements_for_product(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Vec<StockMovement>> {
        let tables = self.tables.lock().await;
        let mut movements: Vec<_> = tables
            .movements
            .iter()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect();
        newest_first(&mut movements);
        Ok(movements)
    }

    async fn movement_counts(&self) -> StoreResult<Vec<(MovementKind, u64)>> {
        let tables = self.tables.lock().await;
        Ok(MovementKind::ALL
            .into_iter()
            .map(|kind| {
                let n = tables.movements.iter().filter(|m| m.kind == kind).count() as u64;
                (kind, n)
            })
            .filter(|(_, n)| *n > 0)
            .collect())
    }
}
