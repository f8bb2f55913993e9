//! Purchasing domain module (purchase orders).
//!
//! Owns the purchase-order status lifecycle and the receipt policy that decides
//! whether (and when) a purchase order credits stock.

pub mod order;

pub use order::{PurchaseOrderStatus, ReceiptPolicy};
