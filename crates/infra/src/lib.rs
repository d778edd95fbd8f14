//! Infrastructure layer: storage, event publishing, workflow orchestrators,
//! background workers and configuration.

pub mod config;
pub mod publisher;
pub mod services;
pub mod store;
pub mod workers;

#[cfg(test)]
mod integration_tests;

pub use config::{
    ConfigError, DestoreConfig, FinanceConfig, InventoryConfig, LoyaltyConfig, NotificationConfig,
    ObservabilityConfig, PricingConfig,
};
pub use publisher::{EventPublisher, SharedBus};
pub use services::finance::{CancelToken, FinanceService, LendingPartner, SimulatedLender};
pub use services::inventory::{CreateStockItem, InventoryService};
pub use services::loyalty::LoyaltyService;
pub use services::notifications::{NotificationDispatcher, notification_bindings};
pub use services::price::PriceService;
pub use store::{EntityStore, InMemoryEntityStore, KeyedLocks, LedgerLog};
pub use workers::{PeriodicWorker, SubscriptionWorker, WorkerError, WorkerHandle};
