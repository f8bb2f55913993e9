//! Stock ledger and movement recorder.
//!
//! The ledger owns every change to a stock quantity. Each change locks the
//! stock row, applies the domain rule (never negative) and appends the
//! matching movement, all inside the caller's transaction: neither the
//! quantity write nor the movement happens without the other.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use stockflow_core::{DomainError, ProductId};
use stockflow_inventory::{Direction, MovementKind, OrderRef, StockMovement};

use crate::error::{ServiceResult, StoreResult};
use crate::store::{Store, StoreTx};

/// Append-only writer of the movement log.
///
/// Rows are never updated. The only removal path is [`MovementRecorder::purge_order`],
/// used when an order is deleted.
#[derive(Debug, Default, Clone, Copy)]
pub struct MovementRecorder;

impl MovementRecorder {
    pub async fn append<T: StoreTx>(
        &self,
        tx: &mut T,
        movement: &StockMovement,
    ) -> StoreResult<()> {
        tx.insert_movement(movement).await
    }

    pub async fn for_order<T: StoreTx>(
        &self,
        tx: &mut T,
        origin: OrderRef,
    ) -> StoreResult<Vec<StockMovement>> {
        tx.movements_for_order(origin).await
    }

    pub async fn purge_order<T: StoreTx>(&self, tx: &mut T, origin: OrderRef) -> StoreResult<u64> {
        tx.delete_movements_for_order(origin).await
    }
}

/// Per-product quantity ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct StockLedger {
    recorder: MovementRecorder,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorder(&self) -> &MovementRecorder {
        &self.recorder
    }

    /// Current quantity, or `NotFound` when the product has no stock row.
    pub async fn get_quantity<S: Store>(
        &self,
        store: &S,
        product_id: ProductId,
    ) -> ServiceResult<i64> {
        store
            .stock_entry(product_id)
            .await?
            .map(|entry| entry.quantity)
            .ok_or_else(|| DomainError::not_found("stock for product", product_id).into())
    }

    /// Remove `quantity` units and append an `exit` movement.
    ///
    /// A missing stock row counts as zero available.
    pub async fn debit<T: StoreTx>(
        &self,
        tx: &mut T,
        product_id: ProductId,
        quantity: i64,
        origin: Option<OrderRef>,
        description: Option<String>,
    ) -> ServiceResult<StockMovement> {
        let kind = MovementKind::Exit;
        self.record(tx, product_id, kind, Direction::Outbound, quantity, description, origin)
            .await
    }

    /// Add `quantity` units and append an `entry` movement.
    pub async fn credit<T: StoreTx>(
        &self,
        tx: &mut T,
        product_id: ProductId,
        quantity: i64,
        origin: Option<OrderRef>,
        description: Option<String>,
    ) -> ServiceResult<StockMovement> {
        let kind = MovementKind::Entry;
        self.record(tx, product_id, kind, Direction::Inbound, quantity, description, origin)
            .await
    }

    /// Manual correction in either direction, recorded as an `adjustment`.
    pub async fn adjust<T: StoreTx>(
        &self,
        tx: &mut T,
        product_id: ProductId,
        direction: Direction,
        quantity: i64,
        description: Option<String>,
    ) -> ServiceResult<StockMovement> {
        let kind = MovementKind::Adjustment;
        self.record(tx, product_id, kind, direction, quantity, description, None)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    #[instrument(
        skip_all,
        fields(
            product_id = %product_id,
            kind = kind.as_str(),
            direction = direction.as_str(),
            quantity = quantity
        ),
        err
    )]
    async fn record<T: StoreTx>(
        &self,
        tx: &mut T,
        product_id: ProductId,
        kind: MovementKind,
        direction: Direction,
        quantity: i64,
        description: Option<String>,
        origin: Option<OrderRef>,
    ) -> ServiceResult<StockMovement> {
        let now = Utc::now();
        let movement =
            StockMovement::new(product_id, kind, direction, quantity, description, origin, now)?;

        let mut entry = tx.lock_stock(product_id, now).await?;
        entry.apply_movement(&movement)?;
        tx.write_stock(&entry).await?;
        self.recorder.append(tx, &movement).await?;

        debug!(quantity_after = entry.quantity, "stock movement recorded");
        Ok(movement)
    }

    /// Undo the net effect of `movements` on their stock rows, without
    /// recording anything. Used right before the movements themselves are
    /// deleted, so quantities keep matching the remaining log.
    ///
    /// Rows are locked in ascending product order.
    pub async fn revert<T: StoreTx>(
        &self,
        tx: &mut T,
        movements: &[StockMovement],
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let mut net: BTreeMap<ProductId, i64> = BTreeMap::new();
        for movement in movements {
            *net.entry(movement.product_id).or_insert(0) += movement.signed_quantity();
        }

        for (product_id, delta) in net {
            if delta == 0 {
                continue;
            }
            let mut entry = tx.lock_stock(product_id, now).await?;
            entry.revert_net(delta, now)?;
            tx.write_stock(&entry).await?;
        }
        Ok(())
    }
}
