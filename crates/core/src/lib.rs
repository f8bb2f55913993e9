//! `stockflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model and the order model shared by client and
//! purchase orders.

pub mod error;
pub mod id;
pub mod order;

pub use error::{DomainError, DomainResult};
pub use id::{CounterpartyId, MovementId, OrderId, ProductId};
pub use order::{LineItem, Order, OrderDraft, OrderKind, OrderPatch, OrderStatus, compute_total};
