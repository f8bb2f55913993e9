//! Integration tests for the approval pipeline over the in-memory store.
//!
//! Tests: OrderService → TransitionCoordinator → StockLedger → Store
//!
//! Verifies:
//! - Approval debits every line exactly once, or nothing at all
//! - Stock equals the signed sum of its movements after every operation
//! - Concurrent approvals never oversell
//! - Deleting an order removes its movements and their stock effect

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use stockflow_core::{
        CounterpartyId, LineItem, MovementId, OrderDraft, OrderId, OrderPatch, ProductId,
    };
    use stockflow_inventory::{Direction, MovementKind, signed_total};
    use stockflow_purchasing::{PurchaseOrderStatus, ReceiptPolicy};
    use stockflow_sales::ClientOrderStatus;

    use crate::config::ReportingConfig;
    use crate::coordinator::TransitionCoordinator;
    use crate::error::ServiceError;
    use crate::inventory::{InventoryService, ManualMovement};
    use crate::orders::OrderService;
    use crate::reporting::ReportingService;
    use crate::store::{InMemoryStore, Store};

    struct Harness {
        store: Arc<InMemoryStore>,
        orders: OrderService<InMemoryStore>,
        coordinator: TransitionCoordinator<InMemoryStore>,
        inventory: InventoryService<InMemoryStore>,
        reporting: ReportingService<InMemoryStore>,
    }

    fn setup() -> Harness {
        setup_with_policy(ReceiptPolicy::None)
    }

    fn setup_with_policy(policy: ReceiptPolicy) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        Harness {
            orders: OrderService::new(store.clone()),
            coordinator: TransitionCoordinator::new(store.clone()).with_receipt_policy(policy),
            inventory: InventoryService::new(store.clone()),
            reporting: ReportingService::new(
                store.clone(),
                ReportingConfig {
                    movement_limit: 10,
                    low_stock_threshold: 20,
                },
            ),
            store,
        }
    }

    fn line(product_id: ProductId, quantity: i64) -> LineItem {
        LineItem {
            product_id,
            quantity,
            unit_price: 100,
        }
    }

    impl Harness {
        async fn stock_up(&self, product_id: ProductId, quantity: i64) {
            self.inventory
                .record_movement(ManualMovement {
                    product_id,
                    kind: MovementKind::Entry,
                    direction: None,
                    quantity,
                    description: Some("initial stock".to_string()),
                })
                .await
                .unwrap();
        }

        async fn client_order(&self, lines: Vec<LineItem>) -> OrderId {
            let draft = OrderDraft::new(CounterpartyId::new(), lines, None).unwrap();
            self.orders
                .create::<ClientOrderStatus>(draft)
                .await
                .unwrap()
                .id
        }

        async fn quantity(&self, product_id: ProductId) -> i64 {
            self.inventory.get_quantity(product_id).await.unwrap()
        }

        /// Stock equals the signed sum of the product's movements.
        async fn assert_reconciled(&self, product_id: ProductId) {
            let movements = self.store.movements_for_product(product_id).await.unwrap();
            let quantity = self
                .store
                .stock_entry(product_id)
                .await
                .unwrap()
                .map_or(0, |e| e.quantity);
            assert!(quantity >= 0);
            assert_eq!(quantity, signed_total(&movements));
        }

        async fn exits_for(&self, product_id: ProductId) -> usize {
            self.store
                .movements_for_product(product_id)
                .await
                .unwrap()
                .iter()
                .filter(|m| m.kind == MovementKind::Exit)
                .count()
        }
    }

    #[tokio::test]
    async fn approval_with_one_short_line_changes_nothing() {
        let h = setup();
        let (a, b) = (ProductId::new(), ProductId::new());
        h.stock_up(a, 10).await;
        h.stock_up(b, 2).await;
        let id = h.client_order(vec![line(a, 5), line(b, 3)]).await;

        let err = h
            .coordinator
            .transition(id, ClientOrderStatus::Approved)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ServiceError::InsufficientStock {
                product_id: b,
                required: 3,
                available: 2
            }
        );
        assert_eq!(h.quantity(a).await, 10);
        assert_eq!(h.quantity(b).await, 2);
        assert_eq!(h.exits_for(a).await, 0);
        let order = h.orders.get::<ClientOrderStatus>(id).await.unwrap();
        assert_eq!(order.status, ClientOrderStatus::Pending);
    }

    #[tokio::test]
    async fn approval_debits_stock_and_records_one_exit_per_product() {
        let h = setup();
        let a = ProductId::new();
        h.stock_up(a, 10).await;
        let id = h.client_order(vec![line(a, 5)]).await;

        let order = h
            .coordinator
            .transition(id, ClientOrderStatus::Approved)
            .await
            .unwrap();

        assert_eq!(order.status, ClientOrderStatus::Approved);
        assert_eq!(h.quantity(a).await, 5);
        let movements = h.reporting.movements_for_product(a).await.unwrap();
        let exits: Vec<_> = movements.iter().filter(|m| m.kind == MovementKind::Exit).collect();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].quantity, 5);
        assert_eq!(exits[0].direction, Direction::Outbound);
        assert_eq!(exits[0].origin.map(|o| o.order_id), Some(id));
        h.assert_reconciled(a).await;
    }

    #[tokio::test]
    async fn reapproval_is_an_idempotent_status_write() {
        let h = setup();
        let a = ProductId::new();
        h.stock_up(a, 10).await;
        let id = h.client_order(vec![line(a, 5)]).await;

        h.coordinator.transition(id, ClientOrderStatus::Approved).await.unwrap();
        let again = h
            .coordinator
            .transition(id, ClientOrderStatus::Approved)
            .await
            .unwrap();

        assert_eq!(again.status, ClientOrderStatus::Approved);
        assert_eq!(h.quantity(a).await, 5);
        assert_eq!(h.exits_for(a).await, 1);
        h.assert_reconciled(a).await;
    }

    #[tokio::test]
    async fn unknown_status_fails_before_touching_the_store() {
        let h = setup();
        let before = h.store.transactions_started();

        let err = h
            .coordinator
            .transition_str::<ClientOrderStatus>(OrderId::new(), "bogus")
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(h.store.transactions_started(), before);
        assert!(h.reporting.recent_movements(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let h = setup();
        let err = h
            .coordinator
            .transition(OrderId::new(), ClientOrderStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "client order", .. }));
    }

    #[tokio::test]
    async fn edge_outside_the_graph_is_rejected_without_changes() {
        let h = setup();
        let a = ProductId::new();
        h.stock_up(a, 10).await;
        let id = h.client_order(vec![line(a, 5)]).await;
        h.coordinator.transition(id, ClientOrderStatus::Rejected).await.unwrap();

        let err = h
            .coordinator
            .transition(id, ClientOrderStatus::Approved)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ServiceError::InvalidTransition {
                from: "rejected",
                to: "approved"
            }
        );
        assert!(!err.is_retryable());
        assert_eq!(h.quantity(a).await, 10);
    }

    #[tokio::test]
    async fn duplicate_product_lines_are_checked_against_their_sum() {
        let h = setup();
        let a = ProductId::new();
        h.stock_up(a, 6).await;
        let id = h.client_order(vec![line(a, 4), line(a, 4)]).await;

        let err = h
            .coordinator
            .transition(id, ClientOrderStatus::Approved)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ServiceError::InsufficientStock {
                product_id: a,
                required: 8,
                available: 6
            }
        );
        assert_eq!(h.quantity(a).await, 6);
    }

    #[tokio::test]
    async fn product_without_stock_row_counts_as_zero_available() {
        let h = setup();
        let a = ProductId::new();
        let id = h.client_order(vec![line(a, 1)]).await;

        let err = h
            .coordinator
            .transition(id, ClientOrderStatus::Approved)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InsufficientStock { available: 0, .. }));
        // The failed debit must not leave a zero row behind.
        assert!(matches!(
            h.inventory.get_quantity(a).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn competing_approvals_never_oversell() {
        let h = Arc::new(setup());
        let a = ProductId::new();
        h.stock_up(a, 5).await;
        let first = h.client_order(vec![line(a, 4)]).await;
        let second = h.client_order(vec![line(a, 4)]).await;

        let (r1, r2) = tokio::join!(
            {
                let h = h.clone();
                async move { h.coordinator.transition(first, ClientOrderStatus::Approved).await }
            },
            {
                let h = h.clone();
                async move { h.coordinator.transition(second, ClientOrderStatus::Approved).await }
            }
        );

        let outcomes = [r1, r2];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(ServiceError::InsufficientStock { required: 4, available: 1, .. })
        )));
        assert_eq!(h.quantity(a).await, 1);
        h.assert_reconciled(a).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_approvals_of_one_order_debit_once() {
        let h = Arc::new(setup());
        let a = ProductId::new();
        h.stock_up(a, 50).await;
        let id = h.client_order(vec![line(a, 5)]).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let h = h.clone();
            handles.push(tokio::spawn(async move {
                h.coordinator.transition(id, ClientOrderStatus::Approved).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(h.quantity(a).await, 45);
        assert_eq!(h.exits_for(a).await, 1);
    }

    #[tokio::test]
    async fn deleting_an_approved_order_returns_its_stock() {
        let h = setup();
        let a = ProductId::new();
        h.stock_up(a, 10).await;
        let id = h.client_order(vec![line(a, 3)]).await;
        h.coordinator.transition(id, ClientOrderStatus::Approved).await.unwrap();
        assert_eq!(h.quantity(a).await, 7);

        h.orders.delete::<ClientOrderStatus>(id).await.unwrap();

        assert_eq!(h.quantity(a).await, 10);
        assert_eq!(h.exits_for(a).await, 0);
        let lines = h.store.line_items(stockflow_core::OrderKind::Client, id).await.unwrap();
        assert!(lines.is_empty());
        assert!(matches!(
            h.orders.get::<ClientOrderStatus>(id).await,
            Err(ServiceError::NotFound { .. })
        ));
        h.assert_reconciled(a).await;
    }

    #[tokio::test]
    async fn deleting_a_missing_order_is_not_found() {
        let h = setup();
        let err = h
            .orders
            .delete::<PurchaseOrderStatus>(OrderId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "purchase order", .. }));
    }

    #[tokio::test]
    async fn delete_fails_when_reverting_a_receipt_would_go_negative() {
        let h = setup_with_policy(ReceiptPolicy::CreditOnApproval);
        let a = ProductId::new();
        let draft = OrderDraft::new(CounterpartyId::new(), vec![line(a, 10)], None).unwrap();
        let po = h.orders.create::<PurchaseOrderStatus>(draft).await.unwrap();
        h.coordinator.transition(po.id, PurchaseOrderStatus::Approved).await.unwrap();
        assert_eq!(h.quantity(a).await, 10);

        // Sell most of the received stock.
        let co = h.client_order(vec![line(a, 8)]).await;
        h.coordinator.transition(co, ClientOrderStatus::Approved).await.unwrap();

        let err = h.orders.delete::<PurchaseOrderStatus>(po.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock { required: 10, available: 2, .. }));
        assert!(h.orders.get::<PurchaseOrderStatus>(po.id).await.is_ok());
        assert_eq!(h.quantity(a).await, 2);
        h.assert_reconciled(a).await;
    }

    #[tokio::test]
    async fn purchase_approval_does_not_credit_by_default() {
        let h = setup();
        let a = ProductId::new();
        let draft = OrderDraft::new(CounterpartyId::new(), vec![line(a, 10)], None).unwrap();
        let po = h.orders.create::<PurchaseOrderStatus>(draft).await.unwrap();

        for next in [
            PurchaseOrderStatus::Approved,
            PurchaseOrderStatus::Shipped,
            PurchaseOrderStatus::Delivered,
        ] {
            h.coordinator.transition(po.id, next).await.unwrap();
        }

        assert!(h.store.stock_entry(a).await.unwrap().is_none());
        assert!(h.reporting.recent_movements(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn credit_on_delivery_credits_once_with_order_reference() {
        let h = setup_with_policy(ReceiptPolicy::CreditOnDelivery);
        let a = ProductId::new();
        let draft = OrderDraft::new(CounterpartyId::new(), vec![line(a, 7)], None).unwrap();
        let po = h.orders.create::<PurchaseOrderStatus>(draft).await.unwrap();

        for next in [
            PurchaseOrderStatus::Approved,
            PurchaseOrderStatus::Shipped,
            PurchaseOrderStatus::Delivered,
            PurchaseOrderStatus::Delivered,
        ] {
            h.coordinator.transition(po.id, next).await.unwrap();
        }

        assert_eq!(h.quantity(a).await, 7);
        let movements = h.reporting.movements_for_product(a).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Entry);
        assert_eq!(
            movements[0].origin.map(|o| (o.kind, o.order_id)),
            Some((stockflow_core::OrderKind::Purchase, po.id))
        );
    }

    #[tokio::test]
    async fn only_pending_orders_can_be_edited() {
        let h = setup();
        let (a, b) = (ProductId::new(), ProductId::new());
        h.stock_up(a, 10).await;
        let id = h.client_order(vec![line(a, 2)]).await;

        let patch =
            OrderPatch::replace_all(CounterpartyId::new(), vec![line(b, 1), line(a, 3)], None)
                .unwrap();
        let updated = h
            .orders
            .update::<ClientOrderStatus>(id, patch)
            .await
            .unwrap();
        assert_eq!(updated.total_amount, 400);
        let lines = h.orders.line_items::<ClientOrderStatus>(id).await.unwrap();
        assert_eq!(lines, vec![line(b, 1), line(a, 3)]);

        h.stock_up(b, 1).await;
        h.coordinator.transition(id, ClientOrderStatus::Approved).await.unwrap();

        let patch = OrderPatch {
            total_amount: Some(1),
            ..OrderPatch::default()
        };
        let err = h
            .orders
            .update::<ClientOrderStatus>(id, patch)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvariantViolation(_)));
        assert_eq!(h.orders.get::<ClientOrderStatus>(id).await.unwrap().total_amount, 400);
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let h = setup();
        let a = ProductId::new();
        let first = h.client_order(vec![line(a, 1)]).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = h.client_order(vec![line(a, 1)]).await;

        let ids: Vec<_> = h
            .orders
            .list::<ClientOrderStatus>()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn manual_adjustments_obey_the_non_negative_rule() {
        let h = setup();
        let a = ProductId::new();
        h.stock_up(a, 3).await;

        let err = h
            .inventory
            .record_movement(ManualMovement {
                product_id: a,
                kind: MovementKind::Adjustment,
                direction: Some(Direction::Outbound),
                quantity: 4,
                description: Some("count correction".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock { .. }));

        let err = h
            .inventory
            .record_movement(ManualMovement {
                product_id: a,
                kind: MovementKind::Adjustment,
                direction: None,
                quantity: 1,
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        h.inventory
            .record_movement(ManualMovement {
                product_id: a,
                kind: MovementKind::Adjustment,
                direction: Some(Direction::Outbound),
                quantity: 3,
                description: None,
            })
            .await
            .unwrap();
        assert_eq!(h.quantity(a).await, 0);
        h.assert_reconciled(a).await;
    }

    #[tokio::test]
    async fn reports_summarize_stock_and_orders() {
        let h = setup();
        let (a, b) = (ProductId::new(), ProductId::new());
        h.stock_up(a, 30).await;
        h.stock_up(b, 4).await;
        let id = h.client_order(vec![line(b, 4)]).await;
        h.coordinator.transition(id, ClientOrderStatus::Approved).await.unwrap();
        h.client_order(vec![line(a, 1)]).await;

        let summary = h.reporting.movement_summary().await.unwrap();
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.exits, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.out_of_stock, 1);

        let low: Vec<_> = h
            .reporting
            .low_stock(None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.product_id)
            .collect();
        assert_eq!(low, vec![b]);

        let recent = h.reporting.recent_movements(Some(1)).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].kind, MovementKind::Exit);
        assert_eq!(h.reporting.movement(recent[0].id).await.unwrap(), recent[0]);

        let missing = h.reporting.movement(MovementId::new()).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound { entity: "stock movement", .. }));

        let counts = h
            .reporting
            .order_status_counts::<ClientOrderStatus>()
            .await
            .unwrap();
        let as_pairs: Vec<_> = counts.iter().map(|c| (c.status, c.count)).collect();
        assert_eq!(as_pairs, vec![("pending", 1), ("approved", 1), ("rejected", 0)]);
    }

    #[tokio::test]
    async fn default_low_stock_threshold_is_inclusive() {
        let h = setup();
        let (at, over) = (ProductId::new(), ProductId::new());
        h.stock_up(at, 20).await;
        h.stock_up(over, 21).await;

        let low = h.reporting.low_stock(None).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, at);
        assert_eq!(low[0].quantity, 20);

        let explicit = h.reporting.low_stock(Some(21)).await.unwrap();
        assert_eq!(explicit.len(), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Stock(usize, i64),
        Order(Vec<(usize, i64)>),
        Approve(usize),
        Delete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..3, 1i64..20).prop_map(|(p, q)| Op::Stock(p, q)),
            prop::collection::vec((0usize..3, 1i64..10), 1..4).prop_map(Op::Order),
            (0usize..8).prop_map(Op::Approve),
            (0usize..8).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of stock entries, order creations,
        /// approvals and deletions, every product's stock is non-negative and
        /// equals the signed sum of its remaining movements.
        #[test]
        fn stock_always_reconciles_with_movements(ops in prop::collection::vec(op(), 1..30)) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let h = setup();
                let products = [ProductId::new(), ProductId::new(), ProductId::new()];
                let mut orders: Vec<OrderId> = Vec::new();

                for op in ops {
                    match op {
                        Op::Stock(p, q) => h.stock_up(products[p], q).await,
                        Op::Order(lines) => {
                            let lines =
                                lines.into_iter().map(|(p, q)| line(products[p], q)).collect();
                            orders.push(h.client_order(lines).await);
                        }
                        Op::Approve(i) => {
                            if let Some(id) = orders.get(i) {
                                let approved = ClientOrderStatus::Approved;
                                let _ = h.coordinator.transition(*id, approved).await;
                            }
                        }
                        Op::Delete(i) => {
                            if i < orders.len() {
                                let id = orders[i];
                                if h.orders.delete::<ClientOrderStatus>(id).await.is_ok() {
                                    orders.remove(i);
                                }
                            }
                        }
                    }
                    for product in products {
                        h.assert_reconciled(product).await;
                    }
                }
            });
        }
    }
}
