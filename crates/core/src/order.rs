//! Order model shared by client and purchase orders.
//!
//! Both order kinds have the same shape: a header (counterparty, total, status)
//! and an ordered set of line items. They differ only in their status
//! enumeration, which is modelled by the [`OrderStatus`] trait and implemented
//! by the `sales` and `purchasing` crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{CounterpartyId, OrderId, ProductId};

/// Order variant. Selects the status machine and the backing tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Client,
    Purchase,
}

impl OrderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderKind::Client => "client",
            OrderKind::Purchase => "purchase",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "client" => Ok(OrderKind::Client),
            "purchase" => Ok(OrderKind::Purchase),
            other => Err(DomainError::validation(format!("unknown order kind '{other}'"))),
        }
    }
}

impl core::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order line: product, quantity, price at the time the order was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: i64,
}

impl LineItem {
    pub fn new(product_id: ProductId, quantity: i64, unit_price: i64) -> DomainResult<Self> {
        let line = Self {
            product_id,
            quantity,
            unit_price,
        };
        line.validate()?;
        Ok(line)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "line item for product {} must have a positive quantity",
                self.product_id
            )));
        }
        if self.unit_price < 0 {
            return Err(DomainError::validation(format!(
                "line item for product {} cannot have a negative price",
                self.product_id
            )));
        }
        Ok(())
    }

    pub fn line_total(&self) -> Option<i64> {
        self.quantity.checked_mul(self.unit_price)
    }
}

/// Sum of `quantity * unit_price` over all lines.
pub fn compute_total(lines: &[LineItem]) -> DomainResult<i64> {
    lines.iter().try_fold(0i64, |acc, line| {
        line.line_total()
            .and_then(|t| acc.checked_add(t))
            .ok_or_else(|| DomainError::validation("order total overflows"))
    })
}

fn validate_lines(lines: &[LineItem]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::validation("an order needs at least one line item"));
    }
    lines.iter().try_for_each(LineItem::validate)
}

fn resolve_total(lines: &[LineItem], total_amount: Option<i64>) -> DomainResult<i64> {
    let total = match total_amount {
        Some(t) => t,
        None => compute_total(lines)?,
    };
    if total < 0 {
        return Err(DomainError::validation("total_amount cannot be negative"));
    }
    Ok(total)
}

/// Closed status enumeration of one order kind, plus its transition graph.
///
/// Statuses are parsed once at ingress (HTTP body, database row) and carried
/// as the typed value afterwards.
pub trait OrderStatus:
    Copy + Eq + core::fmt::Debug + Serialize + Send + Sync + 'static
{
    const KIND: OrderKind;
    /// Status of a freshly created order.
    const INITIAL: Self;
    /// Status whose first entry fires the stock effect.
    const APPROVED: Self;

    fn as_str(self) -> &'static str;

    /// Every member of the enumeration.
    fn all() -> &'static [Self];

    /// Statuses reachable in one step (self-transitions excluded).
    fn successors(self) -> &'static [Self];

    fn parse(s: &str) -> DomainResult<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let allowed = Self::all()
                    .iter()
                    .map(|status| status.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                DomainError::validation(format!(
                    "invalid {} order status '{s}' (expected one of: {allowed})",
                    Self::KIND
                ))
            })
    }

    /// Self-transitions are idempotent writes and always allowed.
    fn can_transition_to(self, next: Self) -> bool {
        self == next || self.successors().contains(&next)
    }

    fn check_transition(self, next: Self) -> DomainResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }

    /// True only on the edge from a status other than `target` into `target`.
    fn enters(self, next: Self, target: Self) -> bool {
        next == target && self != target
    }

    /// Only orders still in their initial status may have their lines replaced.
    fn is_editable(self) -> bool {
        self == Self::INITIAL
    }
}

/// Order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order<S> {
    pub id: OrderId,
    pub counterparty_id: CounterpartyId,
    /// Total in smallest currency unit.
    pub total_amount: i64,
    pub status: S,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<S: OrderStatus> Order<S> {
    /// New header in the initial status.
    pub fn from_draft(id: OrderId, draft: &OrderDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            counterparty_id: draft.counterparty_id,
            total_amount: draft.total_amount,
            status: S::INITIAL,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> OrderKind {
        S::KIND
    }
}

/// Validated input for creating an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub counterparty_id: CounterpartyId,
    pub lines: Vec<LineItem>,
    pub total_amount: i64,
}

impl OrderDraft {
    /// When `total_amount` is `None` it is computed from the lines.
    pub fn new(
        counterparty_id: CounterpartyId,
        lines: Vec<LineItem>,
        total_amount: Option<i64>,
    ) -> DomainResult<Self> {
        validate_lines(&lines)?;
        let total_amount = resolve_total(&lines, total_amount)?;
        Ok(Self {
            counterparty_id,
            lines,
            total_amount,
        })
    }
}

/// Explicit partial update of an order: exactly the fields allowed to change.
///
/// `lines`, when present, replaces the whole line-item set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPatch {
    pub counterparty_id: Option<CounterpartyId>,
    pub total_amount: Option<i64>,
    pub lines: Option<Vec<LineItem>>,
}

impl OrderPatch {
    /// Full replacement of counterparty and lines; the total is computed when omitted.
    pub fn replace_all(
        counterparty_id: CounterpartyId,
        lines: Vec<LineItem>,
        total_amount: Option<i64>,
    ) -> DomainResult<Self> {
        validate_lines(&lines)?;
        let total_amount = resolve_total(&lines, total_amount)?;
        Ok(Self {
            counterparty_id: Some(counterparty_id),
            total_amount: Some(total_amount),
            lines: Some(lines),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.counterparty_id.is_none() && self.total_amount.is_none() && self.lines.is_none()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if let Some(lines) = &self.lines {
            validate_lines(lines)?;
        }
        if matches!(self.total_amount, Some(t) if t < 0) {
            return Err(DomainError::validation("total_amount cannot be negative"));
        }
        Ok(())
    }

    /// Apply the header fields; line replacement is the store's job.
    pub fn apply_header<S>(&self, order: &mut Order<S>, now: DateTime<Utc>) {
        if let Some(counterparty_id) = self.counterparty_id {
            order.counterparty_id = counterparty_id;
        }
        if let Some(total_amount) = self.total_amount {
            order.total_amount = total_amount;
        }
        order.updated_at = now;
    }
}
