//! Stock levels, manual movements and movement reporting.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use stockflow_core::{MovementId, ProductId};
use stockflow_infra::Store;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router<S: Store>() -> Router {
    Router::new()
        .route("/", get(stock_levels::<S>))
        .route("/movements", get(recent_movements::<S>).post(record_movement::<S>))
        .route("/movements/summary", get(movement_summary::<S>))
        .route("/movements/:id", get(get_movement::<S>))
        .route("/movements/product/:product_id", get(product_movements::<S>))
        .route("/:product_id", get(product_stock::<S>))
}

/// All stock rows, or only those at or below `?below=N`.
pub async fn stock_levels<S: Store>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    query: Result<Query<dto::StockQuery>, QueryRejection>,
) -> Response {
    let query = match errors::query_params(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let levels = match query.below {
        Some(threshold) => services.reporting.low_stock(Some(threshold)).await,
        None => services.reporting.stock_levels().await,
    };
    match levels {
        Ok(levels) => (StatusCode::OK, Json(levels)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn product_stock<S: Store>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Path(product_id): Path<String>,
) -> Response {
    let product_id: ProductId = match errors::parse_id(&product_id, "product id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory.get_quantity(product_id).await {
        Ok(quantity) => (
            StatusCode::OK,
            Json(json!({
                "product_id": product_id.to_string(),
                "quantity": quantity,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn recent_movements<S: Store>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    query: Result<Query<dto::MovementsQuery>, QueryRejection>,
) -> Response {
    let query = match errors::query_params(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    match services.reporting.recent_movements(query.limit).await {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn record_movement<S: Store>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    body: Result<Json<dto::RecordMovementRequest>, JsonRejection>,
) -> Response {
    let movement = match errors::json_body(body).and_then(dto::RecordMovementRequest::into_movement)
    {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    match services.inventory.record_movement(movement).await {
        Ok(recorded) => (StatusCode::CREATED, Json(recorded)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_movement<S: Store>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Path(id): Path<String>,
) -> Response {
    let id: MovementId = match errors::parse_id(&id, "movement id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.reporting.movement(id).await {
        Ok(movement) => (StatusCode::OK, Json(movement)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn movement_summary<S: Store>(
    Extension(services): Extension<Arc<AppServices<S>>>,
) -> Response {
    match services.reporting.movement_summary().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn product_movements<S: Store>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Path(product_id): Path<String>,
) -> Response {
    let product_id: ProductId = match errors::parse_id(&product_id, "product id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.reporting.movements_for_product(product_id).await {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
