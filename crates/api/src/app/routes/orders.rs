//! Client and purchase order routes. One generic router serves both kinds.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde_json::json;

use stockflow_core::OrderId;
use stockflow_infra::{StockEffect, Store};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router<S: Store, St: StockEffect>() -> Router {
    Router::new()
        .route("/", get(list_orders::<S, St>).post(create_order::<S, St>))
        .route("/stats", get(status_counts::<S, St>))
        .route(
            "/:id",
            get(get_order::<S, St>)
                .put(update_order::<S, St>)
                .delete(delete_order::<S, St>),
        )
        .route("/:id/items", get(get_line_items::<S, St>))
        .route("/:id/status", put(transition::<S, St>))
}

pub async fn create_order<S: Store, St: StockEffect>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    body: Result<Json<dto::CreateOrderRequest>, JsonRejection>,
) -> Response {
    let draft = match errors::json_body(body).and_then(dto::CreateOrderRequest::into_draft) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let lines = draft.lines.clone();

    match services.orders.create::<St>(draft).await {
        Ok(order) => (
            StatusCode::CREATED,
            Json(dto::order_with_items_to_json(&order, &lines)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders<S: Store, St: StockEffect>(
    Extension(services): Extension<Arc<AppServices<S>>>,
) -> Response {
    match services.orders.list::<St>().await {
        Ok(orders) => {
            let body: Vec<_> = orders.iter().map(dto::order_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order<S: Store, St: StockEffect>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Path(id): Path<String>,
) -> Response {
    let id: OrderId = match errors::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.get::<St>(id).await {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_line_items<S: Store, St: StockEffect>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Path(id): Path<String>,
) -> Response {
    let id: OrderId = match errors::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.line_items::<St>(id).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_order<S: Store, St: StockEffect>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateOrderRequest>, JsonRejection>,
) -> Response {
    let id: OrderId = match errors::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch = match errors::json_body(body).and_then(dto::UpdateOrderRequest::into_patch) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if patch.is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "nothing to update",
        );
    }

    match services.orders.update::<St>(id, patch).await {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_order<S: Store, St: StockEffect>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Path(id): Path<String>,
) -> Response {
    let id: OrderId = match errors::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.delete::<St>(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn transition<S: Store, St: StockEffect>(
    Extension(services): Extension<Arc<AppServices<S>>>,
    Path(id): Path<String>,
    body: Result<Json<dto::TransitionRequest>, JsonRejection>,
) -> Response {
    let id: OrderId = match errors::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match errors::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.transitions.transition_str::<St>(id, &body.status).await {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn status_counts<S: Store, St: StockEffect>(
    Extension(services): Extension<Arc<AppServices<S>>>,
) -> Response {
    match services.reporting.order_status_counts::<St>().await {
        Ok(counts) => (
            StatusCode::OK,
            Json(json!({
                "kind": St::KIND.as_str(),
                "counts": counts,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
