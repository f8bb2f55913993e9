//! Infrastructure layer: persistence, the stock ledger, the status transition
//! coordinator, order/inventory/reporting services and configuration.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod orders;
pub mod reporting;
pub mod store;

mod integration_tests;

pub use config::{ApiConfig, Config, ConfigError, ReportingConfig, StoreBackend, StoreConfig};
pub use coordinator::{StockEffect, TransitionCoordinator};
pub use error::{ServiceError, ServiceResult, StoreError, StoreResult};
pub use inventory::{InventoryService, ManualMovement};
pub use ledger::{MovementRecorder, StockLedger};
pub use orders::OrderService;
pub use reporting::{MovementSummary, ReportingService, StatusCount};
pub use store::{InMemoryStore, PostgresStore, Store, StoreTx};
