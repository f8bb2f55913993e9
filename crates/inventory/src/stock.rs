use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, ProductId};

use crate::movement::{Direction, StockMovement};

/// Authoritative on-hand quantity of one product.
///
/// Invariant: `quantity >= 0`. Every mutation goes through [`StockEntry::apply`],
/// which refuses any change that would break it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub product_id: ProductId,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

impl StockEntry {
    /// A stock row that does not exist yet counts as zero on hand.
    pub fn empty(product_id: ProductId, at: DateTime<Utc>) -> Self {
        Self {
            product_id,
            quantity: 0,
            updated_at: at,
        }
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    /// Change the quantity by `quantity` units in `direction`.
    pub fn apply(
        &mut self,
        direction: Direction,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation(
                "stock change quantity must be greater than zero",
            ));
        }
        let next = match direction {
            Direction::Inbound => self
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| DomainError::validation("stock quantity overflows"))?,
            Direction::Outbound => {
                if quantity > self.quantity {
                    return Err(DomainError::insufficient_stock(
                        self.product_id,
                        quantity,
                        self.quantity,
                    ));
                }
                self.quantity - quantity
            }
        };
        self.quantity = next;
        self.updated_at = at;
        Ok(())
    }

    pub fn debit(&mut self, quantity: i64, at: DateTime<Utc>) -> DomainResult<()> {
        self.apply(Direction::Outbound, quantity, at)
    }

    pub fn credit(&mut self, quantity: i64, at: DateTime<Utc>) -> DomainResult<()> {
        self.apply(Direction::Inbound, quantity, at)
    }

    /// Apply the effect of `movement` (which must belong to this product).
    pub fn apply_movement(&mut self, movement: &StockMovement) -> DomainResult<()> {
        if movement.product_id != self.product_id {
            return Err(DomainError::invariant(format!(
                "movement for product {} applied to stock of product {}",
                movement.product_id, self.product_id
            )));
        }
        self.apply(movement.direction, movement.quantity, movement.movement_date)
    }

    /// Undo a net signed change of `delta` units. Zero is a no-op.
    pub fn revert_net(&mut self, delta: i64, at: DateTime<Utc>) -> DomainResult<()> {
        let applied = match delta.signum() {
            0 => return Ok(()),
            1 => Direction::Inbound,
            _ => Direction::Outbound,
        };
        self.apply(applied.reversed(), delta.abs(), at)
    }
}

/// Sum quantities per product, in ascending product-id order.
///
/// Two lines for the same product become one requirement, and iteration order
/// doubles as the row-lock order.
pub fn aggregate_by_product(
    lines: impl IntoIterator<Item = (ProductId, i64)>,
) -> DomainResult<BTreeMap<ProductId, i64>> {
    let mut totals = BTreeMap::new();
    for (product_id, quantity) in lines {
        let slot: &mut i64 = totals.entry(product_id).or_insert(0);
        *slot = slot.checked_add(quantity).ok_or_else(|| {
            DomainError::validation(format!("quantity for product {product_id} overflows"))
        })?;
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::{MovementKind, signed_total};
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn stocked(quantity: i64) -> StockEntry {
        let mut entry = StockEntry::empty(ProductId::new(), test_time());
        if quantity > 0 {
            entry.credit(quantity, test_time()).unwrap();
        }
        entry
    }

    #[test]
    fn debit_beyond_available_reports_shortfall() {
        let mut entry = stocked(2);
        let err = entry.debit(3, test_time()).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product_id: entry.product_id,
                required: 3,
                available: 2,
            }
        );
        assert_eq!(entry.quantity, 2);
    }

    #[test]
    fn debit_to_exactly_zero_is_allowed() {
        let mut entry = stocked(5);
        entry.debit(5, test_time()).unwrap();
        assert_eq!(entry.quantity, 0);
        assert!(entry.is_out_of_stock());
    }

    #[test]
    fn missing_row_behaves_as_zero_available() {
        let mut entry = StockEntry::empty(ProductId::new(), test_time());
        let err = entry.debit(1, test_time()).unwrap_err();
        match err {
            DomainError::InsufficientStock { available: 0, required: 1, .. } => {}
            other => panic!("expected insufficient stock, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_change_is_a_validation_error() {
        let mut entry = stocked(5);
        assert!(matches!(entry.credit(0, test_time()), Err(DomainError::Validation(_))));
        assert!(matches!(entry.debit(-2, test_time()), Err(DomainError::Validation(_))));
    }

    #[test]
    fn foreign_movement_is_refused() {
        let mut entry = stocked(5);
        let movement = StockMovement::new(
            ProductId::new(),
            MovementKind::Entry,
            Direction::Inbound,
            1,
            None,
            None,
            test_time(),
        )
        .unwrap();
        assert!(matches!(
            entry.apply_movement(&movement),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn revert_undoes_movement() {
        let mut entry = stocked(10);
        let movement = StockMovement::new(
            entry.product_id,
            MovementKind::Exit,
            Direction::Outbound,
            4,
            None,
            None,
            test_time(),
        )
        .unwrap();
        entry.apply_movement(&movement).unwrap();
        assert_eq!(entry.quantity, 6);
        entry
            .revert_net(movement.signed_quantity(), test_time())
            .unwrap();
        assert_eq!(entry.quantity, 10);

        let err = entry.revert_net(11, test_time()).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                required: 11,
                available: 10,
                ..
            }
        ));
        entry.revert_net(0, test_time()).unwrap();
        assert_eq!(entry.quantity, 10);
    }

    #[test]
    fn aggregate_sums_duplicates_in_product_order() {
        let a = ProductId::new();
        let b = ProductId::new();
        let totals = aggregate_by_product([(b, 2), (a, 1), (b, 3)]).unwrap();
        assert_eq!(totals.get(&a), Some(&1));
        assert_eq!(totals.get(&b), Some(&5));
        let keys: Vec<_> = totals.keys().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever sequence of changes is attempted, the quantity never
        /// goes negative and always equals the signed sum of the accepted movements.
        #[test]
        fn quantity_reconciles_with_accepted_movements(
            changes in prop::collection::vec((any::<bool>(), 1i64..50i64), 0..40)
        ) {
            let mut entry = StockEntry::empty(ProductId::new(), test_time());
            let mut accepted: Vec<StockMovement> = Vec::new();

            for (inbound, quantity) in changes {
                let (kind, direction) = if inbound {
                    (MovementKind::Entry, Direction::Inbound)
                } else {
                    (MovementKind::Exit, Direction::Outbound)
                };
                let movement = StockMovement::new(
                    entry.product_id, kind, direction, quantity, None, None, test_time(),
                ).unwrap();

                let before = entry.quantity;
                match entry.apply_movement(&movement) {
                    Ok(()) => accepted.push(movement),
                    Err(DomainError::InsufficientStock { required, available, .. }) => {
                        prop_assert_eq!(required, quantity);
                        prop_assert_eq!(available, before);
                        prop_assert_eq!(entry.quantity, before);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }

                prop_assert!(entry.quantity >= 0);
                prop_assert_eq!(entry.quantity, signed_total(&accepted));
            }
        }
    }
}
