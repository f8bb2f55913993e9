use std::sync::Arc;

use stockflow_infra::{
    Config, InventoryService, OrderService, ReportingService, Store, TransitionCoordinator,
};

/// Every service the handlers use, sharing one store.
pub struct AppServices<S> {
    pub orders: OrderService<S>,
    pub transitions: TransitionCoordinator<S>,
    pub inventory: InventoryService<S>,
    pub reporting: ReportingService<S>,
}

impl<S: Store> AppServices<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            orders: OrderService::new(Arc::clone(&store)),
            transitions: TransitionCoordinator::new(Arc::clone(&store))
                .with_receipt_policy(config.receipt_policy),
            inventory: InventoryService::new(Arc::clone(&store)),
            reporting: ReportingService::new(store, config.reporting),
        }
    }
}
