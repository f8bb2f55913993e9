//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the service bundle built over one injected store
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use stockflow_infra::{Config, Store};
use stockflow_purchasing::PurchaseOrderStatus;
use stockflow_sales::ClientOrderStatus;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router over `store` (public entrypoint used by `main.rs`).
pub fn build_app<S: Store>(store: Arc<S>, config: &Config) -> Router {
    let services = Arc::new(AppServices::new(store, config));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/client-orders", routes::orders::router::<S, ClientOrderStatus>())
        .nest("/purchase-orders", routes::orders::router::<S, PurchaseOrderStatus>())
        .nest("/stock", routes::stock::router::<S>())
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
