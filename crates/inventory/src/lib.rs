//! Inventory domain module.
//!
//! Per-product stock quantities and the append-only movement log that explains
//! them, implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Persistence and atomicity live in `stockflow-infra`.

pub mod movement;
pub mod stock;

pub use movement::{Direction, MovementKind, OrderRef, StockMovement, signed_total};
pub use stock::{StockEntry, aggregate_by_product};
