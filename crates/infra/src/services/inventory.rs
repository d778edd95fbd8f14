use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use destore_core::{DomainResult, ProductId, StoreId};
use destore_inventory::{NewStockItem, StockItem, StockKey, StockMovement, StockOutcome};

use crate::config::InventoryConfig;
use crate::publisher::EventPublisher;
use crate::services::require;
use crate::store::{EntityStore, KeyedLocks, LedgerLog};

/// Request to start tracking a product at a store. Unset thresholds take the
/// configured defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStockItem {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub product_sku: String,
    pub product_name: String,
    pub initial_quantity: u32,
    pub low_stock_threshold: Option<u32>,
    pub reorder_quantity: Option<u32>,
    pub warehouse_id: Option<String>,
}

/// Stock ledger orchestrator.
///
/// A quantity change and its movement entry commit together: if the ledger
/// append fails the previous item snapshot is restored.
pub struct InventoryService {
    items: Arc<dyn EntityStore<StockItem>>,
    movements: Arc<LedgerLog<StockKey, StockMovement>>,
    locks: KeyedLocks<StockKey>,
    publisher: EventPublisher,
    config: InventoryConfig,
}

impl InventoryService {
    pub fn new(
        items: Arc<dyn EntityStore<StockItem>>,
        movements: Arc<LedgerLog<StockKey, StockMovement>>,
        publisher: EventPublisher,
        config: InventoryConfig,
    ) -> Self {
        Self {
            items,
            movements,
            locks: KeyedLocks::new(),
            publisher,
            config,
        }
    }

    pub fn create_stock_item(&self, req: CreateStockItem) -> DomainResult<StockItem> {
        let key = StockKey {
            product_id: req.product_id,
            store_id: req.store_id,
        };
        let cmd = NewStockItem {
            product_id: req.product_id,
            store_id: req.store_id,
            product_sku: req.product_sku,
            product_name: req.product_name,
            initial_quantity: req.initial_quantity,
            low_stock_threshold: req
                .low_stock_threshold
                .unwrap_or(self.config.default_low_stock_threshold),
            reorder_quantity: req.reorder_quantity.unwrap_or(self.config.default_reorder_quantity),
            warehouse_id: req.warehouse_id,
        };

        self.locks.with_lock(&key, || {
            let outcome = StockItem::create(&cmd, Utc::now())?;
            self.items.insert(outcome.item.clone())?;
            if let Err(err) = self.record_movement(&outcome) {
                self.items.remove(&key)?;
                return Err(err);
            }
            info!(%key, quantity = outcome.item.quantity(), "stock item created");
            Ok(self.finish(outcome))
        })
    }

    pub fn add_stock(&self, product_id: ProductId, store_id: StoreId, qty: u32, reason: &str) -> DomainResult<StockItem> {
        self.mutate(StockKey { product_id, store_id }, |item| item.add_stock(qty, reason, Utc::now()))
    }

    pub fn remove_stock(&self, product_id: ProductId, store_id: StoreId, qty: u32, reason: &str) -> DomainResult<StockItem> {
        self.mutate(StockKey { product_id, store_id }, |item| item.remove_stock(qty, reason, Utc::now()))
    }

    pub fn adjust_stock(
        &self,
        product_id: ProductId,
        store_id: StoreId,
        new_quantity: u32,
        reason: &str,
    ) -> DomainResult<StockItem> {
        self.mutate(StockKey { product_id, store_id }, |item| {
            item.adjust_stock(new_quantity, reason, Utc::now())
        })
    }

    pub fn reserve_stock(&self, product_id: ProductId, store_id: StoreId, qty: u32, reason: &str) -> DomainResult<StockItem> {
        self.mutate(StockKey { product_id, store_id }, |item| item.reserve_stock(qty, reason, Utc::now()))
    }

    pub fn release_stock(&self, product_id: ProductId, store_id: StoreId, qty: u32, reason: &str) -> DomainResult<StockItem> {
        self.mutate(StockKey { product_id, store_id }, |item| item.release_stock(qty, reason, Utc::now()))
    }

    pub fn update_thresholds(
        &self,
        product_id: ProductId,
        store_id: StoreId,
        low_stock_threshold: u32,
        reorder_quantity: u32,
    ) -> DomainResult<StockItem> {
        self.mutate(StockKey { product_id, store_id }, |item| {
            item.update_thresholds(low_stock_threshold, reorder_quantity, Utc::now())
        })
    }

    pub fn get_stock(&self, product_id: ProductId, store_id: StoreId) -> DomainResult<StockItem> {
        let key = StockKey { product_id, store_id };
        require(self.items.get(&key)?, "StockItem", key)
    }

    pub fn store_inventory(&self, store_id: StoreId) -> DomainResult<Vec<StockItem>> {
        let mut items = self.items.filter(&|i: &StockItem| i.store_id() == store_id)?;
        items.sort_by(|a, b| a.product_sku().cmp(b.product_sku()));
        Ok(items)
    }

    /// Items at `store_id` currently low or out of stock.
    pub fn low_stock_items(&self, store_id: StoreId) -> DomainResult<Vec<StockItem>> {
        Ok(self
            .store_inventory(store_id)?
            .into_iter()
            .filter(|i| i.status().needs_alert())
            .collect())
    }

    /// Movement ledger of one item, oldest first.
    pub fn movements(&self, product_id: ProductId, store_id: StoreId) -> DomainResult<Vec<StockMovement>> {
        self.movements.entries(&StockKey { product_id, store_id })
    }

    /// Re-publish an alert for every item currently low or out of stock.
    ///
    /// Each item is re-read under its own key lock; no lock is held across the
    /// sweep. Returns the number of alerts published.
    pub fn publish_low_stock_alerts(&self) -> DomainResult<usize> {
        let candidates: Vec<StockKey> = self
            .items
            .filter(&|i: &StockItem| i.status().needs_alert())?
            .iter()
            .map(StockItem::key)
            .collect();

        let mut published = 0;
        for key in candidates {
            let sent = self.locks.with_lock(&key, || -> DomainResult<bool> {
                let Some(item) = self.items.get(&key)? else {
                    return Ok(false);
                };
                let Some(alert) = item.low_stock_alert() else {
                    return Ok(false);
                };
                Ok(self
                    .publisher
                    .publish(Some(item.store_id()), alert, Utc::now())
                    .is_some())
            })?;
            if sent {
                published += 1;
            }
        }

        debug!(published, "low stock sweep finished");
        Ok(published)
    }

    fn mutate(
        &self,
        key: StockKey,
        op: impl FnOnce(&StockItem) -> DomainResult<StockOutcome>,
    ) -> DomainResult<StockItem> {
        self.locks.with_lock(&key, || {
            let current = require(self.items.get(&key)?, "StockItem", key)?;
            let outcome = op(&current)?;

            self.items.save(outcome.item.clone())?;
            if let Err(err) = self.record_movement(&outcome) {
                self.items.save(current)?;
                return Err(err);
            }

            info!(
                %key,
                quantity = outcome.item.quantity(),
                reserved = outcome.item.reserved_quantity(),
                status = ?outcome.item.status(),
                "stock updated"
            );
            Ok(self.finish(outcome))
        })
    }

    fn record_movement(&self, outcome: &StockOutcome) -> DomainResult<()> {
        match &outcome.movement {
            Some(movement) => self.movements.append(outcome.item.key(), movement.clone()),
            None => Ok(()),
        }
    }

    /// Publish the low-stock check. Runs under the key's lock.
    fn finish(&self, outcome: StockOutcome) -> StockItem {
        if let Some(alert) = outcome.alert {
            self.publisher
                .publish(Some(outcome.item.store_id()), alert, outcome.item.updated_at());
        }
        outcome.item
    }
}

impl core::fmt::Debug for InventoryService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InventoryService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryEntityStore;
    use destore_core::DomainError;
    use destore_events::topics::{INVENTORY_LOW_STOCK, INVENTORY_OUT_OF_STOCK};
    use destore_events::{Delivery, EventBus, InMemoryTopicExchange, QueueBinding, Subscription};
    use destore_inventory::{LowStockEvent, MovementType, StockStatus};
    use serde_json::Value as JsonValue;

    fn service() -> (InventoryService, Subscription<Delivery<JsonValue>>) {
        let exchange = Arc::new(InMemoryTopicExchange::<JsonValue>::new("test"));
        let alerts = exchange
            .declare_queue(QueueBinding::new("alerts").bind("inventory.*"))
            .unwrap();
        let svc = InventoryService::new(
            Arc::new(InMemoryEntityStore::new("StockItem")),
            Arc::new(LedgerLog::new("StockMovement")),
            EventPublisher::new(exchange),
            InventoryConfig::default(),
        );
        (svc, alerts)
    }

    fn create(svc: &InventoryService, qty: u32, threshold: u32) -> StockItem {
        svc.create_stock_item(CreateStockItem {
            product_id: ProductId::new(),
            store_id: StoreId::new(1),
            product_sku: "SKU-1".to_string(),
            product_name: "Widget".to_string(),
            initial_quantity: qty,
            low_stock_threshold: Some(threshold),
            reorder_quantity: None,
            warehouse_id: None,
        })
        .unwrap()
    }

    #[test]
    fn remove_below_threshold_publishes_one_alert() {
        let (svc, alerts) = service();
        let item = create(&svc, 50, 10);
        assert!(alerts.try_recv().is_err());

        let after = svc.remove_stock(item.product_id(), item.store_id(), 45, "sale").unwrap();
        assert_eq!(after.quantity(), 5);
        assert_eq!(after.status(), StockStatus::LowStock);

        let delivery = alerts.try_recv().unwrap();
        assert_eq!(delivery.routing_key(), INVENTORY_LOW_STOCK);
        let envelope = delivery.decode::<LowStockEvent>().unwrap();
        assert_eq!(envelope.payload().current_quantity, 5);
        assert_eq!(envelope.store_id(), Some(StoreId::new(1)));
        assert!(alerts.try_recv().is_err());
    }

    #[test]
    fn out_of_stock_routes_separately() {
        let (svc, alerts) = service();
        let item = create(&svc, 3, 10);
        // created below threshold
        assert_eq!(alerts.try_recv().unwrap().routing_key(), INVENTORY_LOW_STOCK);

        svc.remove_stock(item.product_id(), item.store_id(), 3, "sale").unwrap();
        let delivery = alerts.try_recv().unwrap();
        assert_eq!(delivery.routing_key(), INVENTORY_OUT_OF_STOCK);
        assert!(delivery.decode::<LowStockEvent>().unwrap().payload().out_of_stock);
    }

    #[test]
    fn rejected_removal_changes_nothing() {
        let (svc, _alerts) = service();
        let item = create(&svc, 5, 2);

        for _ in 0..2 {
            let err = svc.remove_stock(item.product_id(), item.store_id(), 6, "sale").unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }

        let current = svc.get_stock(item.product_id(), item.store_id()).unwrap();
        assert_eq!(current.quantity(), 5);
        assert_eq!(svc.movements(item.product_id(), item.store_id()).unwrap().len(), 1);
    }

    #[test]
    fn add_then_remove_records_two_movements() {
        let (svc, _alerts) = service();
        let item = create(&svc, 0, 0);

        svc.add_stock(item.product_id(), item.store_id(), 7, "delivery").unwrap();
        let back = svc.remove_stock(item.product_id(), item.store_id(), 7, "sale").unwrap();
        assert_eq!(back.quantity(), 0);

        let movements = svc.movements(item.product_id(), item.store_id()).unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].movement_type, MovementType::StockIn);
        assert_eq!((movements[0].previous_quantity, movements[0].new_quantity), (0, 7));
        assert_eq!(movements[1].movement_type, MovementType::StockOut);
        assert_eq!((movements[1].previous_quantity, movements[1].new_quantity), (7, 0));
    }

    #[test]
    fn duplicate_item_is_rejected() {
        let (svc, _alerts) = service();
        let item = create(&svc, 5, 2);
        let err = svc
            .create_stock_item(CreateStockItem {
                product_id: item.product_id(),
                store_id: item.store_id(),
                product_sku: "SKU-1".to_string(),
                product_name: "Widget".to_string(),
                initial_quantity: 1,
                low_stock_threshold: None,
                reorder_quantity: None,
                warehouse_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn missing_item_is_not_found() {
        let (svc, _alerts) = service();
        let err = svc.add_stock(ProductId::new(), StoreId::new(9), 1, "x").unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn sweep_republishes_current_alerts() {
        let (svc, alerts) = service();
        let low = create(&svc, 2, 10);
        let _healthy = create(&svc, 100, 10);
        while alerts.try_recv().is_ok() {}

        assert_eq!(svc.publish_low_stock_alerts().unwrap(), 1);
        let envelope = alerts.try_recv().unwrap().decode::<LowStockEvent>().unwrap();
        assert_eq!(envelope.payload().product_id, low.product_id());

        assert_eq!(svc.low_stock_items(StoreId::new(1)).unwrap().len(), 1);
        assert_eq!(svc.store_inventory(StoreId::new(1)).unwrap().len(), 2);
    }

    #[test]
    fn concurrent_removals_never_oversell() {
        let (svc, _alerts) = service();
        let svc = Arc::new(svc);
        let item = create(&svc, 100, 0);
        let (product_id, store_id) = (item.product_id(), item.store_id());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = Arc::clone(&svc);
                std::thread::spawn(move || {
                    (0..20)
                        .filter(|_| svc.remove_stock(product_id, store_id, 1, "sale").is_ok())
                        .count()
                })
            })
            .collect();
        let sold: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(sold, 100);
        assert_eq!(svc.get_stock(product_id, store_id).unwrap().quantity(), 0);
        assert_eq!(svc.movements(product_id, store_id).unwrap().len(), 101);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(u32),
            Remove(u32),
            Adjust(u32),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1u32..30).prop_map(Op::Add),
                (1u32..30).prop_map(Op::Remove),
                (0u32..60).prop_map(Op::Adjust),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 200,
                ..ProptestConfig::default()
            })]

            #[test]
            fn ledger_replays_to_current_quantity(
                initial in 0u32..50,
                ops in prop::collection::vec(op(), 0..25),
            ) {
                let (svc, _alerts) = service();
                let item = create(&svc, initial, 10);
                let (p, s) = (item.product_id(), item.store_id());

                for op in &ops {
                    // rejected removals are part of the property
                    let _ = match *op {
                        Op::Add(q) => svc.add_stock(p, s, q, "in"),
                        Op::Remove(q) => svc.remove_stock(p, s, q, "out"),
                        Op::Adjust(q) => svc.adjust_stock(p, s, q, "count"),
                    };
                }

                let movements = svc.movements(p, s).unwrap();
                let replayed: i64 = movements.iter().map(|m| m.quantity).sum();
                let current = svc.get_stock(p, s).unwrap();
                prop_assert_eq!(replayed, i64::from(current.quantity()));

                for pair in movements.windows(2) {
                    prop_assert_eq!(pair[0].new_quantity, pair[1].previous_quantity);
                }
            }
        }
    }
}
