//! Read-only stock, movement and order reporting.

use std::sync::Arc;

use serde::Serialize;

use stockflow_core::{DomainError, MovementId, OrderStatus, ProductId};
use stockflow_inventory::{MovementKind, StockEntry, StockMovement};

use crate::config::ReportingConfig;
use crate::error::ServiceResult;
use crate::store::Store;

/// Movement counts by kind plus the number of products with zero stock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MovementSummary {
    pub entries: u64,
    pub exits: u64,
    pub adjustments: u64,
    pub total: u64,
    pub out_of_stock: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: &'static str,
    pub count: u64,
}

pub struct ReportingService<S> {
    store: Arc<S>,
    config: ReportingConfig,
}

impl<S> Clone for ReportingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl<S: Store> ReportingService<S> {
    pub fn new(store: Arc<S>, config: ReportingConfig) -> Self {
        Self { store, config }
    }

    /// Every stock row, ascending by product.
    pub async fn stock_levels(&self) -> ServiceResult<Vec<StockEntry>> {
        Ok(self.store.stock_levels(None).await?)
    }

    /// Rows with `quantity <= threshold` (configured default when `None`), lowest first.
    pub async fn low_stock(&self, threshold: Option<i64>) -> ServiceResult<Vec<StockEntry>> {
        let threshold = threshold.unwrap_or(self.config.low_stock_threshold);
        Ok(self.store.stock_levels(Some(threshold)).await?)
    }

    /// The most recent `limit` movements (configured default when `None`), newest first.
    pub async fn recent_movements(
        &self,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<StockMovement>> {
        let limit = limit.unwrap_or(self.config.movement_limit);
        Ok(self.store.recent_movements(limit).await?)
    }

    /// One movement by id. `NotFound` if no such movement was recorded.
    pub async fn movement(&self, id: MovementId) -> ServiceResult<StockMovement> {
        self.store
            .movement(id)
            .await?
            .ok_or_else(|| DomainError::not_found("stock movement", id).into())
    }

    pub async fn movements_for_product(
        &self,
        product_id: ProductId,
    ) -> ServiceResult<Vec<StockMovement>> {
        Ok(self.store.movements_for_product(product_id).await?)
    }

    pub async fn movement_summary(&self) -> ServiceResult<MovementSummary> {
        let mut summary = MovementSummary {
            out_of_stock: self.store.out_of_stock_count().await?,
            ..MovementSummary::default()
        };
        for (kind, n) in self.store.movement_counts().await? {
            match kind {
                MovementKind::Entry => summary.entries = n,
                MovementKind::Exit => summary.exits = n,
                MovementKind::Adjustment => summary.adjustments = n,
            }
            summary.total += n;
        }
        Ok(summary)
    }

    /// Order count for every status of the kind, zeros included, in graph order.
    pub async fn order_status_counts<St: OrderStatus>(&self) -> ServiceResult<Vec<StatusCount>> {
        let counts = self.store.order_status_counts::<St>().await?;
        Ok(St::all()
            .iter()
            .map(|status| StatusCount {
                status: status.as_str(),
                count: counts
                    .iter()
                    .find(|(s, _)| s == status)
                    .map_or(0, |(_, n)| *n),
            })
            .collect())
    }
}
