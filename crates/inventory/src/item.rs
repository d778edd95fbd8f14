use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use destore_core::{DomainError, DomainResult, Entity, ProductId, StoreId};

use crate::events::LowStockEvent;
use crate::movement::{MovementType, StockMovement};

/// Unique key of a stock item: one item per product per store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockKey {
    pub product_id: ProductId,
    pub store_id: StoreId,
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "productId={}, storeId={}", self.product_id, self.store_id)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
    /// Set by purchasing systems; never derived from quantities.
    OnOrder,
}

impl StockStatus {
    /// Derived status for an available quantity against a threshold.
    pub fn derive(available: u32, threshold: u32) -> Self {
        if available == 0 {
            StockStatus::OutOfStock
        } else if available < threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn needs_alert(self) -> bool {
        matches!(self, StockStatus::LowStock | StockStatus::OutOfStock)
    }
}

/// Stock of one product at one store.
///
/// `status` is recomputed by every mutation and cannot be set by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    product_id: ProductId,
    store_id: StoreId,
    product_sku: String,
    product_name: String,
    quantity: u32,
    reserved_quantity: u32,
    low_stock_threshold: u32,
    reorder_quantity: u32,
    warehouse_id: Option<String>,
    status: StockStatus,
    version: u64,
    last_restocked_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// Command: create a stock item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockItem {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub product_sku: String,
    pub product_name: String,
    pub initial_quantity: u32,
    pub low_stock_threshold: u32,
    pub reorder_quantity: u32,
    pub warehouse_id: Option<String>,
}

/// Result of a stock mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockOutcome {
    pub item: StockItem,
    /// Ledger entry to append in the same commit as `item`.
    pub movement: Option<StockMovement>,
    /// Alert to publish after the commit.
    pub alert: Option<LowStockEvent>,
}

fn ensure_positive(qty: u32, what: &str) -> DomainResult<()> {
    if qty == 0 {
        return Err(DomainError::validation(format!("{what} quantity must be positive")));
    }
    Ok(())
}

impl StockItem {
    pub fn create(cmd: &NewStockItem, at: DateTime<Utc>) -> DomainResult<StockOutcome> {
        if cmd.product_sku.trim().is_empty() {
            return Err(DomainError::validation("product sku cannot be empty"));
        }

        let mut item = Self {
            product_id: cmd.product_id,
            store_id: cmd.store_id,
            product_sku: cmd.product_sku.trim().to_string(),
            product_name: cmd.product_name.clone(),
            quantity: cmd.initial_quantity,
            reserved_quantity: 0,
            low_stock_threshold: cmd.low_stock_threshold,
            reorder_quantity: cmd.reorder_quantity,
            warehouse_id: cmd.warehouse_id.clone(),
            status: StockStatus::OutOfStock,
            version: 1,
            last_restocked_at: None,
            updated_at: at,
        };
        item.recompute_status();

        let movement = (cmd.initial_quantity > 0).then(|| {
            item.movement(
                MovementType::StockIn,
                i64::from(cmd.initial_quantity),
                0,
                "Initial stock",
                at,
            )
        });

        Ok(item.into_outcome(movement))
    }

    pub fn add_stock(&self, qty: u32, reason: &str, at: DateTime<Utc>) -> DomainResult<StockOutcome> {
        ensure_positive(qty, "stock-in")?;
        let new_quantity = self
            .quantity
            .checked_add(qty)
            .ok_or_else(|| DomainError::validation("stock quantity overflow"))?;

        let mut next = self.next(at);
        next.quantity = new_quantity;
        next.last_restocked_at = Some(at);
        next.recompute_status();

        let movement = next.movement(MovementType::StockIn, i64::from(qty), self.quantity, reason, at);
        Ok(next.into_outcome(Some(movement)))
    }

    /// Fails with a validation error (and no change) when fewer than `qty`
    /// units are available.
    pub fn remove_stock(&self, qty: u32, reason: &str, at: DateTime<Utc>) -> DomainResult<StockOutcome> {
        ensure_positive(qty, "stock-out")?;
        self.ensure_available(qty)?;

        let mut next = self.next(at);
        next.quantity = self.quantity - qty;
        next.recompute_status();

        let movement = next.movement(MovementType::StockOut, -i64::from(qty), self.quantity, reason, at);
        Ok(next.into_outcome(Some(movement)))
    }

    pub fn adjust_stock(&self, new_quantity: u32, reason: &str, at: DateTime<Utc>) -> DomainResult<StockOutcome> {
        let delta = i64::from(new_quantity) - i64::from(self.quantity);

        let mut next = self.next(at);
        next.quantity = new_quantity;
        next.recompute_status();

        let movement = next.movement(MovementType::Adjustment, delta, self.quantity, reason, at);
        Ok(next.into_outcome(Some(movement)))
    }

    pub fn reserve_stock(&self, qty: u32, reason: &str, at: DateTime<Utc>) -> DomainResult<StockOutcome> {
        ensure_positive(qty, "reservation")?;
        self.ensure_available(qty)?;

        let mut next = self.next(at);
        next.reserved_quantity = self.reserved_quantity + qty;
        next.recompute_status();

        let movement = next.movement(MovementType::Reserved, i64::from(qty), self.quantity, reason, at);
        Ok(next.into_outcome(Some(movement)))
    }

    pub fn release_stock(&self, qty: u32, reason: &str, at: DateTime<Utc>) -> DomainResult<StockOutcome> {
        ensure_positive(qty, "release")?;
        if qty > self.reserved_quantity {
            return Err(DomainError::validation(format!(
                "Cannot release more than reserved. Reserved: {}, Requested: {}",
                self.reserved_quantity, qty
            )));
        }

        let mut next = self.next(at);
        next.reserved_quantity = self.reserved_quantity - qty;
        next.recompute_status();

        let movement = next.movement(MovementType::Released, i64::from(qty), self.quantity, reason, at);
        Ok(next.into_outcome(Some(movement)))
    }

    /// Change alert thresholds. Quantities are untouched, so no ledger entry.
    pub fn update_thresholds(
        &self,
        low_stock_threshold: u32,
        reorder_quantity: u32,
        at: DateTime<Utc>,
    ) -> DomainResult<StockOutcome> {
        let mut next = self.next(at);
        next.low_stock_threshold = low_stock_threshold;
        next.reorder_quantity = reorder_quantity;
        next.recompute_status();
        Ok(next.into_outcome(None))
    }

    /// Alert for the current state, if the item is low or out of stock.
    pub fn low_stock_alert(&self) -> Option<LowStockEvent> {
        self.status.needs_alert().then(|| LowStockEvent {
            product_id: self.product_id,
            product_sku: self.product_sku.clone(),
            product_name: self.product_name.clone(),
            current_quantity: self.available_quantity(),
            threshold: self.low_stock_threshold,
            reorder_quantity: self.reorder_quantity,
            warehouse_id: self.warehouse_id.clone(),
            out_of_stock: self.status == StockStatus::OutOfStock,
        })
    }

    fn ensure_available(&self, qty: u32) -> DomainResult<()> {
        let available = self.available_quantity();
        if available < qty {
            return Err(DomainError::validation(format!(
                "Insufficient stock. Available: {available}, Requested: {qty}"
            )));
        }
        Ok(())
    }

    fn next(&self, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next.updated_at = at;
        next
    }

    fn recompute_status(&mut self) {
        self.status = StockStatus::derive(self.available_quantity(), self.low_stock_threshold);
    }

    fn movement(
        &self,
        movement_type: MovementType,
        quantity: i64,
        previous_quantity: u32,
        reason: &str,
        at: DateTime<Utc>,
    ) -> StockMovement {
        StockMovement {
            product_id: self.product_id,
            store_id: self.store_id,
            movement_type,
            quantity,
            previous_quantity,
            new_quantity: self.quantity,
            reason: reason.to_string(),
            occurred_at: at,
        }
    }

    fn into_outcome(self, movement: Option<StockMovement>) -> StockOutcome {
        let alert = self.low_stock_alert();
        StockOutcome {
            item: self,
            movement,
            alert,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey {
            product_id: self.product_id,
            store_id: self.store_id,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn product_sku(&self) -> &str {
        &self.product_sku
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn reserved_quantity(&self) -> u32 {
        self.reserved_quantity
    }

    /// `max(0, quantity - reserved)`.
    pub fn available_quantity(&self) -> u32 {
        self.quantity.saturating_sub(self.reserved_quantity)
    }

    pub fn low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
    }

    pub fn reorder_quantity(&self) -> u32 {
        self.reorder_quantity
    }

    pub fn warehouse_id(&self) -> Option<&str> {
        self.warehouse_id.as_deref()
    }

    pub fn status(&self) -> StockStatus {
        self.status
    }

    pub fn last_restocked_at(&self) -> Option<DateTime<Utc>> {
        self.last_restocked_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for StockItem {
    type Id = StockKey;

    fn id(&self) -> StockKey {
        self.key()
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32, threshold: u32) -> StockItem {
        StockItem::create(
            &NewStockItem {
                product_id: ProductId::new(),
                store_id: StoreId::new(12),
                product_sku: "SKU-100".to_string(),
                product_name: "Oak Table".to_string(),
                initial_quantity: quantity,
                low_stock_threshold: threshold,
                reorder_quantity: 50,
                warehouse_id: None,
            },
            Utc::now(),
        )
        .unwrap()
        .item
    }

    #[test]
    fn remove_into_low_stock_raises_alert() {
        let out = item(5, 10).remove_stock(2, "sale", Utc::now()).unwrap();

        assert_eq!(out.item.quantity(), 3);
        assert_eq!(out.item.status(), StockStatus::LowStock);

        let alert = out.alert.expect("low stock alert");
        assert_eq!(alert.current_quantity, 3);
        assert_eq!(alert.threshold, 10);
        assert!(!alert.out_of_stock);
        assert_eq!(destore_events::Event::routing_key(&alert), "inventory.low-stock");
    }

    #[test]
    fn out_of_stock_routes_separately_but_keeps_event_type() {
        let out = item(2, 10).remove_stock(2, "sale", Utc::now()).unwrap();
        assert_eq!(out.item.status(), StockStatus::OutOfStock);

        let alert = out.alert.unwrap();
        assert!(alert.out_of_stock);
        assert_eq!(destore_events::Event::event_type(&alert), "inventory.low-stock");
        assert_eq!(destore_events::Event::routing_key(&alert), "inventory.out-of-stock");
    }

    #[test]
    fn in_stock_mutation_raises_no_alert() {
        let out = item(50, 10).add_stock(5, "delivery", Utc::now()).unwrap();
        assert_eq!(out.item.status(), StockStatus::InStock);
        assert!(out.alert.is_none());
        assert!(out.item.last_restocked_at().is_some());
    }

    #[test]
    fn remove_more_than_available_is_rejected() {
        let it = item(5, 2);
        let err = it.remove_stock(6, "sale", Utc::now()).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("Insufficient stock")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn reservations_reduce_availability() {
        let it = item(10, 3);
        let reserved = it.reserve_stock(8, "order 1", Utc::now()).unwrap();
        assert_eq!(reserved.item.available_quantity(), 2);
        assert_eq!(reserved.item.quantity(), 10);
        assert_eq!(reserved.item.status(), StockStatus::LowStock);
        assert_eq!(reserved.movement.as_ref().unwrap().movement_type, MovementType::Reserved);

        assert!(reserved.item.remove_stock(3, "sale", Utc::now()).is_err());

        let released = reserved.item.release_stock(8, "order 1 cancelled", Utc::now()).unwrap();
        assert_eq!(released.item.available_quantity(), 10);
        assert_eq!(released.item.status(), StockStatus::InStock);

        assert!(released.item.release_stock(1, "nothing reserved", Utc::now()).is_err());
    }

    #[test]
    fn adjustment_records_signed_delta() {
        let out = item(20, 5).adjust_stock(7, "stock take", Utc::now()).unwrap();
        let m = out.movement.unwrap();
        assert_eq!(m.movement_type, MovementType::Adjustment);
        assert_eq!(m.quantity, -13);
        assert_eq!(m.previous_quantity, 20);
        assert_eq!(m.new_quantity, 7);
    }

    #[test]
    fn raising_threshold_recomputes_status_without_movement() {
        let out = item(8, 5).update_thresholds(10, 40, Utc::now()).unwrap();
        assert_eq!(out.item.status(), StockStatus::LowStock);
        assert!(out.movement.is_none());
        assert!(out.alert.is_some());
    }

    #[test]
    fn create_below_threshold_alerts_immediately() {
        let out = StockItem::create(
            &NewStockItem {
                product_id: ProductId::new(),
                store_id: StoreId::new(1),
                product_sku: "SKU-1".to_string(),
                product_name: "Lamp".to_string(),
                initial_quantity: 0,
                low_stock_threshold: 10,
                reorder_quantity: 50,
                warehouse_id: Some("WH-1".to_string()),
            },
            Utc::now(),
        )
        .unwrap();

        assert!(out.movement.is_none());
        let alert = out.alert.unwrap();
        assert!(alert.out_of_stock);
        assert_eq!(alert.warehouse_id.as_deref(), Some("WH-1"));
    }

    #[test]
    fn zero_quantities_are_rejected() {
        let it = item(5, 1);
        assert!(it.add_stock(0, "x", Utc::now()).is_err());
        assert!(it.remove_stock(0, "x", Utc::now()).is_err());
        assert!(it.reserve_stock(0, "x", Utc::now()).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(u32),
            Remove(u32),
            Adjust(u32),
            Reserve(u32),
            Release(u32),
            Thresholds(u32),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1u32..50).prop_map(Op::Add),
                (1u32..50).prop_map(Op::Remove),
                (0u32..100).prop_map(Op::Adjust),
                (1u32..30).prop_map(Op::Reserve),
                (1u32..30).prop_map(Op::Release),
                (0u32..40).prop_map(Op::Thresholds),
            ]
        }

        fn apply(it: &StockItem, op: &Op) -> DomainResult<StockOutcome> {
            let now = Utc::now();
            match op {
                Op::Add(q) => it.add_stock(*q, "p", now),
                Op::Remove(q) => it.remove_stock(*q, "p", now),
                Op::Adjust(q) => it.adjust_stock(*q, "p", now),
                Op::Reserve(q) => it.reserve_stock(*q, "p", now),
                Op::Release(q) => it.release_stock(*q, "p", now),
                Op::Thresholds(t) => it.update_thresholds(*t, 50, now),
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            #[test]
            fn status_always_matches_derived_rule(
                initial in 0u32..100,
                threshold in 0u32..40,
                ops in prop::collection::vec(op(), 0..30),
            ) {
                let mut it = item(initial, threshold);
                for op in &ops {
                    if let Ok(out) = apply(&it, op) {
                        it = out.item;
                    }
                    let available = it.quantity().saturating_sub(it.reserved_quantity());
                    prop_assert_eq!(it.available_quantity(), available);
                    prop_assert_eq!(
                        it.status(),
                        StockStatus::derive(available, it.low_stock_threshold())
                    );
                    prop_assert_ne!(it.status(), StockStatus::OnOrder);
                    prop_assert_eq!(it.low_stock_alert().is_some(), it.status().needs_alert());
                }
            }

            #[test]
            fn over_large_remove_is_rejected_without_change(
                initial in 0u32..100,
                extra in 1u32..100,
            ) {
                let it = item(initial, 10);
                let qty = it.available_quantity() + extra;

                prop_assert!(it.remove_stock(qty, "p", Utc::now()).is_err());
                prop_assert!(it.remove_stock(qty, "p", Utc::now()).is_err());
                prop_assert_eq!(it.quantity(), initial);
            }

            #[test]
            fn add_then_remove_restores_quantity(
                initial in 0u32..1000,
                qty in 1u32..1000,
            ) {
                let it = item(initial, 10);
                let added = it.add_stock(qty, "in", Utc::now()).unwrap();
                let removed = added.item.remove_stock(qty, "out", Utc::now()).unwrap();

                prop_assert_eq!(removed.item.quantity(), initial);

                let m_in = added.movement.unwrap();
                let m_out = removed.movement.unwrap();
                prop_assert_eq!(m_in.movement_type, MovementType::StockIn);
                prop_assert_eq!(m_in.previous_quantity, initial);
                prop_assert_eq!(m_in.new_quantity, initial + qty);
                prop_assert_eq!(m_out.movement_type, MovementType::StockOut);
                prop_assert_eq!(m_out.previous_quantity, initial + qty);
                prop_assert_eq!(m_out.new_quantity, initial);
            }
        }
    }
}
