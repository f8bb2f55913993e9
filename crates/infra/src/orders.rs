//! Order aggregate access: create, read, edit, delete and list.
//!
//! Header and line items are always written together in one atomic unit.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use stockflow_core::{
    DomainError, LineItem, Order, OrderDraft, OrderId, OrderPatch, OrderStatus,
};
use stockflow_inventory::OrderRef;

use crate::coordinator::order_entity;
use crate::error::ServiceResult;
use crate::ledger::StockLedger;
use crate::store::{Store, StoreTx};

pub struct OrderService<S> {
    store: Arc<S>,
    ledger: StockLedger,
}

impl<S> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ledger: self.ledger,
        }
    }
}

impl<S: Store> OrderService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            ledger: StockLedger::new(),
        }
    }

    /// Insert a new order (always in its initial status) with its line items.
    #[instrument(skip(self, draft), fields(kind = %St::KIND, lines = draft.lines.len()), err)]
    pub async fn create<St: OrderStatus>(&self, draft: OrderDraft) -> ServiceResult<Order<St>> {
        let order: Order<St> = Order::from_draft(OrderId::new(), &draft, Utc::now());

        let mut tx = self.store.begin().await?;
        tx.insert_order(&order, &draft.lines).await?;
        tx.commit().await?;

        info!(order_id = %order.id, total_amount = order.total_amount, "order created");
        Ok(order)
    }

    pub async fn get<St: OrderStatus>(&self, id: OrderId) -> ServiceResult<Order<St>> {
        self.store
            .find_order::<St>(id)
            .await?
            .ok_or_else(|| DomainError::not_found(order_entity(St::KIND), id).into())
    }

    /// Line items in their stored order. `NotFound` if the order does not exist.
    pub async fn line_items<St: OrderStatus>(&self, id: OrderId) -> ServiceResult<Vec<LineItem>> {
        self.get::<St>(id).await?;
        Ok(self.store.line_items(St::KIND, id).await?)
    }

    /// Newest first.
    pub async fn list<St: OrderStatus>(&self) -> ServiceResult<Vec<Order<St>>> {
        Ok(self.store.list_orders::<St>().await?)
    }

    /// Apply `patch` to a pending order. Line items, when present, replace the
    /// whole set.
    #[instrument(skip(self, patch), fields(kind = %St::KIND, order_id = %id), err)]
    pub async fn update<St: OrderStatus>(
        &self,
        id: OrderId,
        patch: OrderPatch,
    ) -> ServiceResult<Order<St>> {
        patch.validate()?;

        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_order::<St>(id)
            .await?
            .ok_or_else(|| DomainError::not_found(order_entity(St::KIND), id))?;

        if !order.status.is_editable() {
            return Err(DomainError::invariant(format!(
                "{} {} is {} and can no longer be edited",
                order_entity(St::KIND),
                id,
                order.status.as_str()
            ))
            .into());
        }

        patch.apply_header(&mut order, Utc::now());
        tx.update_order(&order).await?;
        if let Some(lines) = &patch.lines {
            tx.replace_line_items(St::KIND, id, lines).await?;
        }
        tx.commit().await?;

        info!("order updated");
        Ok(order)
    }

    /// Delete the order's movements (reverting their stock effect), its line
    /// items and its header, in one atomic unit.
    #[instrument(skip(self), fields(kind = %St::KIND, order_id = %id), err)]
    pub async fn delete<St: OrderStatus>(&self, id: OrderId) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        tx.lock_order::<St>(id)
            .await?
            .ok_or_else(|| DomainError::not_found(order_entity(St::KIND), id))?;

        let origin = OrderRef::new(St::KIND, id);
        let recorder = *self.ledger.recorder();
        let movements = recorder.for_order(&mut tx, origin).await?;
        self.ledger.revert(&mut tx, &movements, Utc::now()).await?;
        let purged = recorder.purge_order(&mut tx, origin).await?;

        tx.delete_order(St::KIND, id).await?;
        tx.commit().await?;

        info!(movements_purged = purged, "order deleted");
        Ok(())
    }
}
