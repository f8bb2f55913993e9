//! Client (sales) order domain module.
//!
//! Client orders share the order model of `stockflow-core`; this crate owns
//! their status lifecycle. Approval is the edge that debits stock.

pub mod order;

pub use order::ClientOrderStatus;
