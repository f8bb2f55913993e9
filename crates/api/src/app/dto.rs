use axum::response::Response;
use serde::Deserialize;
use serde_json::{Value, json};

use stockflow_core::{
    CounterpartyId, LineItem, Order, OrderDraft, OrderPatch, OrderStatus, ProductId,
    compute_total,
};
use stockflow_infra::ManualMovement;
use stockflow_inventory::{Direction, MovementKind};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub counterparty_id: String,
    pub items: Vec<LineItemRequest>,
    pub total_amount: Option<i64>,
}

/// Every field is optional; `items`, when present, replaces the whole set.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub counterparty_id: Option<String>,
    pub items: Option<Vec<LineItemRequest>>,
    pub total_amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordMovementRequest {
    pub product_id: String,
    pub kind: String,
    pub direction: Option<String>,
    pub quantity: i64,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub below: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementsQuery {
    pub limit: Option<usize>,
}

// -------------------------
// Request -> domain
// -------------------------

fn line_items(items: Vec<LineItemRequest>) -> Result<Vec<LineItem>, Response> {
    items
        .into_iter()
        .map(|item| {
            let product_id: ProductId = errors::parse_id(&item.product_id, "product id")?;
            LineItem::new(product_id, item.quantity, item.unit_price)
                .map_err(errors::domain_error_to_response)
        })
        .collect()
}

impl CreateOrderRequest {
    pub fn into_draft(self) -> Result<OrderDraft, Response> {
        let counterparty_id: CounterpartyId =
            errors::parse_id(&self.counterparty_id, "counterparty id")?;
        let lines = line_items(self.items)?;
        OrderDraft::new(counterparty_id, lines, self.total_amount)
            .map_err(errors::domain_error_to_response)
    }
}

impl UpdateOrderRequest {
    /// New line items without an explicit total recompute the total.
    pub fn into_patch(self) -> Result<OrderPatch, Response> {
        let counterparty_id = self
            .counterparty_id
            .as_deref()
            .map(|raw| errors::parse_id::<CounterpartyId>(raw, "counterparty id"))
            .transpose()?;
        let lines = self.items.map(line_items).transpose()?;

        let total_amount = match (&lines, self.total_amount) {
            (_, Some(total)) => Some(total),
            (Some(lines), None) => {
                Some(compute_total(lines).map_err(errors::domain_error_to_response)?)
            }
            (None, None) => None,
        };

        let patch = OrderPatch {
            counterparty_id,
            total_amount,
            lines,
        };
        patch.validate().map_err(errors::domain_error_to_response)?;
        Ok(patch)
    }
}

impl RecordMovementRequest {
    pub fn into_movement(self) -> Result<ManualMovement, Response> {
        let product_id: ProductId = errors::parse_id(&self.product_id, "product id")?;
        let kind = MovementKind::parse(&self.kind).map_err(errors::domain_error_to_response)?;
        let direction = self
            .direction
            .as_deref()
            .map(Direction::parse)
            .transpose()
            .map_err(errors::domain_error_to_response)?;
        Ok(ManualMovement {
            product_id,
            kind,
            direction,
            quantity: self.quantity,
            description: self.description,
        })
    }
}

// -------------------------
// Domain -> JSON
// -------------------------

pub fn order_to_json<S: OrderStatus>(order: &Order<S>) -> Value {
    json!({
        "id": order.id.to_string(),
        "kind": order.kind().as_str(),
        "counterparty_id": order.counterparty_id.to_string(),
        "total_amount": order.total_amount,
        "status": order.status.as_str(),
        "created_at": order.created_at,
        "updated_at": order.updated_at,
    })
}

pub fn order_with_items_to_json<S: OrderStatus>(order: &Order<S>, items: &[LineItem]) -> Value {
    let mut body = order_to_json(order);
    body["items"] = json!(items);
    body
}
