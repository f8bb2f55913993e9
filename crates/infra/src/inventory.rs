//! Manual stock operations: quantity lookup and movement entry.

use std::sync::Arc;

use tracing::{info, instrument};

use stockflow_core::ProductId;
use stockflow_inventory::{Direction, MovementKind, StockMovement};

use crate::error::ServiceResult;
use crate::ledger::StockLedger;
use crate::store::{Store, StoreTx};

/// A manually entered stock movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualMovement {
    pub product_id: ProductId,
    pub kind: MovementKind,
    /// Required for adjustments; must match the kind for entries and exits.
    pub direction: Option<Direction>,
    pub quantity: i64,
    pub description: Option<String>,
}

pub struct InventoryService<S> {
    store: Arc<S>,
    ledger: StockLedger,
}

impl<S> Clone for InventoryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ledger: self.ledger,
        }
    }
}

impl<S: Store> InventoryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            ledger: StockLedger::new(),
        }
    }

    pub async fn get_quantity(&self, product_id: ProductId) -> ServiceResult<i64> {
        self.ledger.get_quantity(&*self.store, product_id).await
    }

    /// Apply a manual movement: `entry` credits, `exit` debits, `adjustment`
    /// moves stock in its explicit direction.
    #[instrument(
        skip(self, movement),
        fields(
            product_id = %movement.product_id,
            kind = movement.kind.as_str(),
            quantity = movement.quantity
        ),
        err
    )]
    pub async fn record_movement(&self, movement: ManualMovement) -> ServiceResult<StockMovement> {
        let ManualMovement {
            product_id,
            kind,
            direction,
            quantity,
            description,
        } = movement;
        let direction = kind.resolve_direction(direction)?;

        let mut tx = self.store.begin().await?;
        let recorded = match kind {
            MovementKind::Entry => {
                self.ledger
                    .credit(&mut tx, product_id, quantity, None, description)
                    .await
            }
            MovementKind::Exit => {
                self.ledger
                    .debit(&mut tx, product_id, quantity, None, description)
                    .await
            }
            MovementKind::Adjustment => {
                self.ledger
                    .adjust(&mut tx, product_id, direction, quantity, description)
                    .await
            }
        }?;
        tx.commit().await?;

        info!(movement_id = %recorded.id, "manual stock movement recorded");
        Ok(recorded)
    }
}
