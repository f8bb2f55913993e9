use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, MovementId, OrderId, OrderKind, ProductId};

/// Kind of stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Entry,
    Exit,
    Adjustment,
}

impl MovementKind {
    pub const ALL: [MovementKind; 3] = [
        MovementKind::Entry,
        MovementKind::Exit,
        MovementKind::Adjustment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
            MovementKind::Adjustment => "adjustment",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "entry" => Ok(MovementKind::Entry),
            "exit" => Ok(MovementKind::Exit),
            "adjustment" => Ok(MovementKind::Adjustment),
            other => Err(DomainError::validation(format!(
                "invalid movement kind '{other}' (expected one of: entry, exit, adjustment)"
            ))),
        }
    }

    /// Direction implied by the kind. Adjustments carry an explicit one.
    pub fn implied_direction(self) -> Option<Direction> {
        match self {
            MovementKind::Entry => Some(Direction::Inbound),
            MovementKind::Exit => Some(Direction::Outbound),
            MovementKind::Adjustment => None,
        }
    }

    /// Resolve the effective direction for a movement of this kind.
    pub fn resolve_direction(self, requested: Option<Direction>) -> DomainResult<Direction> {
        match (self.implied_direction(), requested) {
            (Some(implied), None) => Ok(implied),
            (Some(implied), Some(requested)) if implied == requested => Ok(implied),
            (Some(implied), Some(requested)) => Err(DomainError::validation(format!(
                "{} movements are always {}, got {}",
                self.as_str(),
                implied.as_str(),
                requested.as_str()
            ))),
            (None, Some(requested)) => Ok(requested),
            (None, None) => Err(DomainError::validation(
                "adjustment movements need a direction (inbound or outbound)",
            )),
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a movement adds to or removes from stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "inbound" => Ok(Direction::Inbound),
            "outbound" => Ok(Direction::Outbound),
            other => Err(DomainError::validation(format!(
                "invalid movement direction '{other}' (expected inbound or outbound)"
            ))),
        }
    }

    pub fn sign(self) -> i64 {
        match self {
            Direction::Inbound => 1,
            Direction::Outbound => -1,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Inbound => Direction::Outbound,
            Direction::Outbound => Direction::Inbound,
        }
    }
}

/// Structured link from a movement to the order whose transition produced it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderRef {
    pub kind: OrderKind,
    pub order_id: OrderId,
}

impl OrderRef {
    pub fn new(kind: OrderKind, order_id: OrderId) -> Self {
        Self { kind, order_id }
    }
}

impl core::fmt::Display for OrderRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} order {}", self.kind, self.order_id)
    }
}

/// Immutable audit row for one committed stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub direction: Direction,
    /// Always positive; `direction` carries the sign.
    pub quantity: i64,
    pub description: Option<String>,
    pub origin: Option<OrderRef>,
    pub movement_date: DateTime<Utc>,
}

impl StockMovement {
    pub fn new(
        product_id: ProductId,
        kind: MovementKind,
        direction: Direction,
        quantity: i64,
        description: Option<String>,
        origin: Option<OrderRef>,
        movement_date: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(
                "movement quantity must be greater than zero",
            ));
        }
        let direction = kind.resolve_direction(Some(direction))?;
        Ok(Self {
            id: MovementId::new(),
            product_id,
            kind,
            direction,
            quantity,
            description,
            origin,
            movement_date,
        })
    }

    pub fn signed_quantity(&self) -> i64 {
        self.direction.sign() * self.quantity
    }
}

/// Signed sum of the given movements.
pub fn signed_total<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> i64 {
    movements.into_iter().map(StockMovement::signed_quantity).sum()
}
