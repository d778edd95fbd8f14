//! Cross-service workflows over the in-memory exchange.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::Value as JsonValue;

use destore_core::{Entity, Money, ProductId, StoreId};
use destore_events::topics::INVENTORY_LOW_STOCK;
use destore_events::{
    BusError, Delivery, EventBus, InMemoryTopicExchange, QueueBinding, Subscription,
};
use destore_finance::{FinanceStatus, NewFinanceApplication};
use destore_inventory::{LowStockEvent, StockStatus};
use destore_notifications::{Notification, NotificationType, SenderRegistry};

use crate::{
    CreateStockItem, EventPublisher, FinanceConfig, FinanceService, InMemoryEntityStore, InventoryConfig,
    InventoryService, LedgerLog, NotificationConfig, NotificationDispatcher, SharedBus,
    SimulatedLender, SubscriptionWorker, notification_bindings,
};

fn exchange() -> Arc<InMemoryTopicExchange<JsonValue>> {
    Arc::new(InMemoryTopicExchange::new("destore.events"))
}

fn inventory(bus: SharedBus) -> InventoryService {
    InventoryService::new(
        Arc::new(InMemoryEntityStore::new("StockItem")),
        Arc::new(LedgerLog::new("StockMovement")),
        EventPublisher::new(bus),
        InventoryConfig::default(),
    )
}

fn finance(bus: SharedBus) -> FinanceService {
    let config = FinanceConfig::default().with_latency_ms(0, 0).with_rng_seed(11);
    FinanceService::new(
        Arc::new(InMemoryEntityStore::new("FinanceApplication")),
        Arc::new(SimulatedLender::from_config(&config)),
        EventPublisher::new(bus),
        config,
    )
}

fn dispatcher() -> Arc<NotificationDispatcher> {
    Arc::new(NotificationDispatcher::new(
        Arc::new(InMemoryEntityStore::<Notification>::new("Notification")),
        SenderRegistry::with_builtin_senders().unwrap(),
        NotificationConfig::default(),
    ))
}

fn wait_for(pred: impl Fn() -> bool) {
    for _ in 0..300 {
        if pred() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not reached");
}

fn stock_item(svc: &InventoryService, qty: u32, threshold: u32) -> (ProductId, StoreId) {
    let item = svc
        .create_stock_item(CreateStockItem {
            product_id: ProductId::new(),
            store_id: StoreId::new(12),
            product_sku: "TV-55".to_string(),
            product_name: "55in Television".to_string(),
            initial_quantity: qty,
            low_stock_threshold: Some(threshold),
            reorder_quantity: Some(20),
            warehouse_id: Some("WH-NORTH".to_string()),
        })
        .unwrap();
    (item.product_id(), item.store_id())
}

#[test]
fn removing_stock_below_threshold_alerts_once_with_current_quantity() {
    let bus = exchange();
    let alerts: Subscription<Delivery<JsonValue>> = bus
        .declare_queue(QueueBinding::new("watch").bind("inventory.*"))
        .unwrap();
    let svc = inventory(bus.clone());

    let (product, store) = stock_item(&svc, 5, 10);
    // created already below threshold
    let _ = alerts.try_recv().unwrap();

    let item = svc.remove_stock(product, store, 2, "Sale").unwrap();
    assert_eq!(item.quantity(), 3);
    assert_eq!(item.status(), StockStatus::LowStock);

    let delivery = alerts.try_recv().unwrap();
    assert_eq!(delivery.routing_key(), INVENTORY_LOW_STOCK);
    let envelope = delivery.decode::<LowStockEvent>().unwrap();
    let event = envelope.payload();
    assert_eq!(event.current_quantity, 3);
    assert_eq!(event.threshold, 10);
    assert!(!event.out_of_stock);
    assert_eq!(envelope.store_id(), Some(store));
    assert!(alerts.try_recv().is_err());
}

#[test]
fn low_stock_alert_reaches_the_store_manager() {
    let bus = exchange();
    let dispatcher = dispatcher();
    let mut workers = Vec::new();
    for binding in notification_bindings() {
        let d = Arc::clone(&dispatcher);
        workers.push(
            SubscriptionWorker::spawn("notify", &*bus, binding, move |delivery: Delivery<JsonValue>| {
                d.handle_delivery(&delivery).map(|_| ())
            })
            .unwrap(),
        );
    }

    let svc = inventory(bus.clone());
    let (product, store) = stock_item(&svc, 50, 10);
    svc.remove_stock(product, store, 48, "Sale").unwrap();

    wait_for(|| dispatcher.notifications_for_store(store).unwrap().len() == 1);
    let sent = &dispatcher.notifications_for_store(store).unwrap()[0];
    assert_eq!(sent.notification_type(), NotificationType::LowStockAlert);
    assert!(sent.message().contains("has 2 units remaining"));

    for w in workers {
        w.shutdown();
    }
}

#[test]
fn approved_finance_decision_is_notified() {
    let bus = exchange();
    let dispatcher = dispatcher();
    let d = Arc::clone(&dispatcher);
    let worker = SubscriptionWorker::spawn(
        "notify-finance",
        &*bus,
        notification_bindings().remove(1),
        move |delivery: Delivery<JsonValue>| d.handle_delivery(&delivery).map(|_| ()),
    )
    .unwrap();

    let svc = finance(bus.clone());
    let app = svc
        .create_application(NewFinanceApplication {
            store_id: StoreId::new(5),
            customer_name: "Alan Turing".to_string(),
            customer_email: "alan@example.com".to_string(),
            customer_phone: None,
            order_reference: None,
            amount: Money::new(dec!(500)),
            term_months: None,
        })
        .unwrap();

    let decided = svc.submit_application(app.id()).unwrap();
    assert_eq!(decided.status(), FinanceStatus::Approved);
    assert_eq!(decided.monthly_payment(), Some(Money::new(dec!(44.13))));

    wait_for(|| dispatcher.notifications_for_store(StoreId::new(5)).unwrap().len() == 1);
    let n = &dispatcher.notifications_for_store(StoreId::new(5)).unwrap()[0];
    assert_eq!(n.notification_type(), NotificationType::FinanceApplicationApproved);
    assert!(n.message().contains("44.13"));
    worker.shutdown();
}

#[test]
fn redelivered_event_creates_one_notification() {
    let bus = exchange();
    let queue = bus
        .declare_queue(notification_bindings().remove(0))
        .unwrap();
    let svc = inventory(bus.clone());
    let (_, store) = stock_item(&svc, 1, 10);

    let delivery = queue.try_recv().unwrap();
    let dispatcher = dispatcher();
    assert!(dispatcher.handle_delivery(&delivery).unwrap().is_some());
    assert!(dispatcher.handle_delivery(&delivery.clone()).unwrap().is_none());
    assert_eq!(dispatcher.notifications_for_store(store).unwrap().len(), 1);
}

/// Exchange whose publishes always fail.
struct BrokenBus {
    attempts: Mutex<usize>,
}

impl EventBus<JsonValue> for BrokenBus {
    type Error = BusError;

    fn publish(&self, _routing_key: &str, _message: JsonValue) -> Result<(), BusError> {
        *self.attempts.lock().unwrap() += 1;
        Err(BusError::Poisoned)
    }

    fn declare_queue(&self, binding: QueueBinding) -> Result<Subscription<Delivery<JsonValue>>, BusError> {
        Err(BusError::QueueAlreadyDeclared(binding.queue().to_string()))
    }
}

#[test]
fn failed_publish_does_not_fail_the_operation() {
    let bus = Arc::new(BrokenBus {
        attempts: Mutex::new(0),
    });
    let svc = inventory(bus.clone());

    let (product, store) = stock_item(&svc, 5, 10);
    let item = svc.remove_stock(product, store, 5, "Sale").unwrap();

    assert_eq!(item.status(), StockStatus::OutOfStock);
    assert_eq!(svc.get_stock(product, store).unwrap().quantity(), 0);
    assert_eq!(svc.movements(product, store).unwrap().len(), 2);
    assert_eq!(*bus.attempts.lock().unwrap(), 2);
}
