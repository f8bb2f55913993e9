use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, OrderKind, OrderStatus};

/// Purchase order status lifecycle.
///
/// `pending -> {approved, rejected}`, then `approved -> shipped -> delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Pending,
    Approved,
    Rejected,
    Shipped,
    Delivered,
}

impl OrderStatus for PurchaseOrderStatus {
    const KIND: OrderKind = OrderKind::Purchase;
    const INITIAL: Self = PurchaseOrderStatus::Pending;
    const APPROVED: Self = PurchaseOrderStatus::Approved;

    fn as_str(self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Approved => "approved",
            PurchaseOrderStatus::Rejected => "rejected",
            PurchaseOrderStatus::Shipped => "shipped",
            PurchaseOrderStatus::Delivered => "delivered",
        }
    }

    fn all() -> &'static [Self] {
        &[
            PurchaseOrderStatus::Pending,
            PurchaseOrderStatus::Approved,
            PurchaseOrderStatus::Rejected,
            PurchaseOrderStatus::Shipped,
            PurchaseOrderStatus::Delivered,
        ]
    }

    fn successors(self) -> &'static [Self] {
        match self {
            PurchaseOrderStatus::Pending => {
                &[PurchaseOrderStatus::Approved, PurchaseOrderStatus::Rejected]
            }
            PurchaseOrderStatus::Approved => &[PurchaseOrderStatus::Shipped],
            PurchaseOrderStatus::Shipped => &[PurchaseOrderStatus::Delivered],
            PurchaseOrderStatus::Rejected | PurchaseOrderStatus::Delivered => &[],
        }
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a purchase order credits stock, and on which edge.
///
/// Never implied: the default is [`ReceiptPolicy::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptPolicy {
    #[default]
    None,
    CreditOnApproval,
    CreditOnDelivery,
}

impl ReceiptPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ReceiptPolicy::None => "none",
            ReceiptPolicy::CreditOnApproval => "credit_on_approval",
            ReceiptPolicy::CreditOnDelivery => "credit_on_delivery",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.trim() {
            "none" => Ok(ReceiptPolicy::None),
            "credit_on_approval" => Ok(ReceiptPolicy::CreditOnApproval),
            "credit_on_delivery" => Ok(ReceiptPolicy::CreditOnDelivery),
            other => Err(DomainError::validation(format!(
                "invalid receipt policy '{other}' \
                 (expected none, credit_on_approval or credit_on_delivery)"
            ))),
        }
    }

    /// Status whose first entry credits the order's lines, if any.
    pub fn credit_trigger(self) -> Option<PurchaseOrderStatus> {
        match self {
            ReceiptPolicy::None => None,
            ReceiptPolicy::CreditOnApproval => Some(PurchaseOrderStatus::Approved),
            ReceiptPolicy::CreditOnDelivery => Some(PurchaseOrderStatus::Delivered),
        }
    }

    /// True when moving `from -> to` should credit stock under this policy.
    pub fn credits_on(self, from: PurchaseOrderStatus, to: PurchaseOrderStatus) -> bool {
        self.credit_trigger()
            .is_some_and(|trigger| from.enters(to, trigger))
    }
}

impl core::fmt::Display for ReceiptPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
