//! Process wiring: one exchange, the five services, and the background
//! workers that consume notifications and run the periodic sweeps.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

use destore_core::DomainError;
use destore_events::{Delivery, InMemoryTopicExchange};
use destore_events::topics::{DESTORE_EXCHANGE, NOTIFICATION_FINANCE_QUEUE, NOTIFICATION_LOW_STOCK_QUEUE};
use destore_infra::{
    ConfigError, DestoreConfig, EventPublisher, FinanceService, InMemoryEntityStore, InventoryService,
    LedgerLog, LoyaltyService, NotificationDispatcher, PeriodicWorker, PriceService, SharedBus,
    SimulatedLender, SubscriptionWorker, WorkerError, WorkerHandle, notification_bindings,
};
use destore_notifications::SenderRegistry;
use destore_pricing::PromotionActivityTracker;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("notification senders: {0}")]
    Senders(#[from] DomainError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Services shared by every caller of the runtime.
#[derive(Debug, Clone)]
pub struct Services {
    pub prices: Arc<PriceService>,
    pub inventory: Arc<InventoryService>,
    pub finance: Arc<FinanceService>,
    pub loyalty: Arc<LoyaltyService>,
    pub notifications: Arc<NotificationDispatcher>,
}

/// A started runtime. Dropping it without [`RuntimeHandle::shutdown`] leaves
/// worker threads running until the process exits.
#[derive(Debug)]
pub struct RuntimeHandle {
    exchange: Arc<InMemoryTopicExchange<JsonValue>>,
    services: Services,
    workers: Vec<WorkerHandle>,
}

pub struct Runtime;

impl Runtime {
    pub fn start(config: DestoreConfig) -> Result<RuntimeHandle, RuntimeError> {
        config.validate()?;

        let exchange = Arc::new(InMemoryTopicExchange::<JsonValue>::new(DESTORE_EXCHANGE));
        let bus: SharedBus = exchange.clone();
        let publisher = EventPublisher::new(bus);

        let senders = SenderRegistry::with_builtin_senders()?;
        senders.ensure_covers(&config.notifications.channels())?;

        let services = Services {
            prices: Arc::new(PriceService::new(
                Arc::new(InMemoryEntityStore::new("Product")),
                Arc::new(InMemoryEntityStore::new("Promotion")),
                Arc::new(InMemoryEntityStore::new("StorePrice")),
                publisher.clone(),
            )),
            inventory: Arc::new(InventoryService::new(
                Arc::new(InMemoryEntityStore::new("StockItem")),
                Arc::new(LedgerLog::new("StockMovement")),
                publisher.clone(),
                config.inventory.clone(),
            )),
            finance: Arc::new(FinanceService::new(
                Arc::new(InMemoryEntityStore::new("FinanceApplication")),
                Arc::new(SimulatedLender::from_config(&config.finance)),
                publisher.clone(),
                config.finance.clone(),
            )),
            loyalty: Arc::new(LoyaltyService::new(
                Arc::new(InMemoryEntityStore::new("LoyaltyCard")),
                Arc::new(LedgerLog::new("PointsTransaction")),
                publisher,
                config.loyalty.clone(),
            )),
            notifications: Arc::new(NotificationDispatcher::new(
                Arc::new(InMemoryEntityStore::new("Notification")),
                senders,
                config.notifications.clone(),
            )),
        };

        let mut workers = Vec::new();
        if let Err(err) = spawn_workers(&exchange, &services, &config, &mut workers) {
            for w in workers.into_iter().rev() {
                w.shutdown();
            }
            return Err(err.into());
        }

        info!(exchange = DESTORE_EXCHANGE, workers = workers.len(), "runtime started");
        Ok(RuntimeHandle {
            exchange,
            services,
            workers,
        })
    }
}

fn spawn_workers(
    exchange: &InMemoryTopicExchange<JsonValue>,
    services: &Services,
    config: &DestoreConfig,
    workers: &mut Vec<WorkerHandle>,
) -> Result<(), WorkerError> {
    for binding in notification_bindings() {
        let name = match binding.queue() {
            NOTIFICATION_LOW_STOCK_QUEUE => "notify-lowstock",
            NOTIFICATION_FINANCE_QUEUE => "notify-finance",
            _ => "notify",
        };
        let dispatcher = Arc::clone(&services.notifications);
        workers.push(SubscriptionWorker::spawn(name, exchange, binding, move |delivery: Delivery<JsonValue>| {
            dispatcher.handle_delivery(&delivery).map(|_| ())
        })?);
    }

    let inventory = Arc::clone(&services.inventory);
    workers.push(PeriodicWorker::spawn(
        "stock-sweep",
        config.inventory.sweep_interval(),
        move || inventory.publish_low_stock_alerts().map(|_| ()),
    )?);

    let prices = Arc::clone(&services.prices);
    let mut tracker = PromotionActivityTracker::new();
    workers.push(PeriodicWorker::spawn(
        "promotion-sweep",
        config.pricing.promotion_sweep_interval(),
        move || prices.observe_promotion_windows(&mut tracker, Utc::now()).map(|_| ()),
    )?);

    Ok(())
}

impl RuntimeHandle {
    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn prices(&self) -> &PriceService {
        &self.services.prices
    }

    pub fn inventory(&self) -> &InventoryService {
        &self.services.inventory
    }

    pub fn finance(&self) -> &FinanceService {
        &self.services.finance
    }

    pub fn loyalty(&self) -> &LoyaltyService {
        &self.services.loyalty
    }

    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.services.notifications
    }

    /// The exchange every service publishes to. Extra queues declared here
    /// observe the same traffic as the notification workers.
    pub fn exchange(&self) -> &Arc<InMemoryTopicExchange<JsonValue>> {
        &self.exchange
    }

    pub fn worker_names(&self) -> Vec<&'static str> {
        self.workers.iter().map(WorkerHandle::name).collect()
    }

    /// Stop every worker, newest first, and wait for each thread to exit.
    pub fn shutdown(self) {
        for w in self.workers.into_iter().rev() {
            let name = w.name();
            w.shutdown();
            info!(worker = name, "worker joined");
        }
        info!("runtime stopped");
    }
}
