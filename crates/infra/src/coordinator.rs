//! Status transition coordinator.
//!
//! A transition runs as one atomic unit:
//! 1. parse the requested status (before any store access)
//! 2. lock the order row and read its current status
//! 3. check the edge against the kind's status graph
//! 4. on the edge that fires a stock effect, debit or credit every line
//!    (aggregated per product, ascending product order)
//! 5. write the new status and commit
//!
//! Any failure rolls the whole unit back: no stock change, no movement, status
//! untouched.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use stockflow_core::{DomainError, Order, OrderId, OrderStatus};
use stockflow_inventory::{Direction, OrderRef, aggregate_by_product};
use stockflow_purchasing::{PurchaseOrderStatus, ReceiptPolicy};
use stockflow_sales::ClientOrderStatus;

use crate::error::{ServiceError, ServiceResult};
use crate::ledger::StockLedger;
use crate::store::{Store, StoreTx};

/// Stock effect attached to the status graph of an order kind.
pub trait StockEffect: OrderStatus {
    /// Direction of the stock change fired by the edge `from -> to`, if any.
    fn stock_effect(from: Self, to: Self, policy: ReceiptPolicy) -> Option<Direction>;
}

impl StockEffect for ClientOrderStatus {
    /// Client orders debit their lines on first entry into `approved`.
    fn stock_effect(from: Self, to: Self, _policy: ReceiptPolicy) -> Option<Direction> {
        from.enters(to, Self::APPROVED).then_some(Direction::Outbound)
    }
}

impl StockEffect for PurchaseOrderStatus {
    /// Purchase orders credit their lines only under an explicit receipt policy.
    fn stock_effect(from: Self, to: Self, policy: ReceiptPolicy) -> Option<Direction> {
        policy.credits_on(from, to).then_some(Direction::Inbound)
    }
}

pub struct TransitionCoordinator<S> {
    store: Arc<S>,
    ledger: StockLedger,
    receipt_policy: ReceiptPolicy,
}

impl<S> Clone for TransitionCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ledger: self.ledger,
            receipt_policy: self.receipt_policy,
        }
    }
}

impl<S: Store> TransitionCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            ledger: StockLedger::new(),
            receipt_policy: ReceiptPolicy::default(),
        }
    }

    pub fn with_receipt_policy(mut self, policy: ReceiptPolicy) -> Self {
        self.receipt_policy = policy;
        self
    }

    /// Transition from a raw status string (HTTP ingress).
    ///
    /// Unknown statuses fail with `Validation` without touching the store.
    pub async fn transition_str<St: StockEffect>(
        &self,
        id: OrderId,
        requested: &str,
    ) -> ServiceResult<Order<St>> {
        let requested = St::parse(requested)?;
        self.transition(id, requested).await
    }

    #[instrument(
        skip(self),
        fields(kind = %St::KIND, order_id = %id, to = requested.as_str()),
        err
    )]
    pub async fn transition<St: StockEffect>(
        &self,
        id: OrderId,
        requested: St,
    ) -> ServiceResult<Order<St>> {
        let mut tx = self.store.begin().await?;

        match self.apply(&mut tx, id, requested).await {
            Ok((order, from, movements)) => {
                tx.commit().await?;
                info!(
                    from = from.as_str(),
                    to = order.status.as_str(),
                    movements,
                    "order status transition committed"
                );
                Ok(order)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "rollback after failed transition failed");
                }
                match &err {
                    ServiceError::InsufficientStock { .. }
                    | ServiceError::InvalidTransition { .. }
                    | ServiceError::TransitionConflict(_) => {
                        warn!(error = %err, "order status transition rejected")
                    }
                    ServiceError::Storage(store_err) => {
                        error!(error = %store_err, "order status transition failed in storage")
                    }
                    _ => {}
                }
                Err(err)
            }
        }
    }

    /// The body of the atomic unit. Returns the updated order, the previous
    /// status and the number of movements recorded.
    async fn apply<St: StockEffect>(
        &self,
        tx: &mut S::Tx,
        id: OrderId,
        requested: St,
    ) -> ServiceResult<(Order<St>, St, usize)> {
        let mut order = tx
            .lock_order::<St>(id)
            .await?
            .ok_or_else(|| DomainError::not_found(order_entity(St::KIND), id))?;
        let from = order.status;
        from.check_transition(requested)?;

        let mut recorded = 0;
        if let Some(direction) = St::stock_effect(from, requested, self.receipt_policy) {
            let origin = OrderRef::new(St::KIND, id);
            let lines = tx.load_line_items(St::KIND, id).await?;
            let required = aggregate_by_product(lines.iter().map(|l| (l.product_id, l.quantity)))?;
            let description = Some(format!("{origin} {}", requested.as_str()));

            for (product_id, quantity) in required {
                match direction {
                    Direction::Outbound => {
                        self.ledger
                            .debit(tx, product_id, quantity, Some(origin), description.clone())
                            .await?
                    }
                    Direction::Inbound => {
                        self.ledger
                            .credit(tx, product_id, quantity, Some(origin), description.clone())
                            .await?
                    }
                };
                recorded += 1;
            }
        }

        order.status = requested;
        order.updated_at = Utc::now();
        tx.update_order(&order).await?;
        Ok((order, from, recorded))
    }
}

/// Entity name used in `NotFound` errors.
pub(crate) fn order_entity(kind: stockflow_core::OrderKind) -> &'static str {
    match kind {
        stockflow_core::OrderKind::Client => "client order",
        stockflow_core::OrderKind::Purchase => "purchase order",
    }
}
