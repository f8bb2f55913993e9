use axum::Json;
use axum::extract::Query;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use stockflow_core::DomainError;
use stockflow_infra::{ServiceError, StoreError};

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        ServiceError::NotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        ServiceError::InsufficientStock {
            product_id,
            required,
            available,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": err.to_string(),
                "product_id": product_id.to_string(),
                "required": required,
                "available": available,
            })),
        )
            .into_response(),
        ServiceError::InvalidTransition { .. } => {
            json_error(StatusCode::CONFLICT, "invalid_transition", err.to_string())
        }
        ServiceError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        ServiceError::TransitionConflict(_) => json_error(
            StatusCode::CONFLICT,
            "conflict",
            "concurrent update, retry the request",
        ),
        ServiceError::Storage(store_err) => storage_error_to_response(&store_err),
    }
}

/// Storage details are logged, never returned.
fn storage_error_to_response(err: &StoreError) -> Response {
    tracing::error!(error = %err, "request failed in storage");
    match err {
        StoreError::Unavailable(_) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "storage_unavailable",
            "storage is unavailable",
        ),
        _ => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            "internal storage error",
        ),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    service_error_to_response(err.into())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Unwrap a JSON body, turning a malformed or mistyped body into a `validation_error`.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(value)| value).map_err(|rejection| {
        json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
    })
}

pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    query.map(|Query(value)| value).map_err(|rejection| {
        json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
    })
}

/// Parse an identifier from a path segment or body field.
pub fn parse_id<T>(raw: &str, what: &'static str) -> Result<T, Response>
where
    T: core::str::FromStr,
{
    raw.trim()
        .parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what}")))
}
