use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use destore_core::{DomainError, DomainResult, Entity, Money, ProductId, PromotionId, StoreId};
use destore_pricing::{
    NewProduct, NewPromotion, PriceChange, PriceChangedEvent, Product, ProductUpdate, Promotion,
    PromotionActivityTracker, PromotionUpdate, StorePrice, StorePriceKey,
};

use crate::publisher::EventPublisher;
use crate::services::require;
use crate::store::{EntityStore, KeyedLocks};

/// Products, promotions and per-store prices.
///
/// Lock order is promotion before price; price-level operations never take a
/// promotion lock.
pub struct PriceService {
    products: Arc<dyn EntityStore<Product>>,
    promotions: Arc<dyn EntityStore<Promotion>>,
    prices: Arc<dyn EntityStore<StorePrice>>,
    sku_locks: KeyedLocks<String>,
    product_locks: KeyedLocks<ProductId>,
    promotion_locks: KeyedLocks<PromotionId>,
    price_locks: KeyedLocks<StorePriceKey>,
    publisher: EventPublisher,
}

impl PriceService {
    pub fn new(
        products: Arc<dyn EntityStore<Product>>,
        promotions: Arc<dyn EntityStore<Promotion>>,
        prices: Arc<dyn EntityStore<StorePrice>>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            products,
            promotions,
            prices,
            sku_locks: KeyedLocks::new(),
            product_locks: KeyedLocks::new(),
            promotion_locks: KeyedLocks::new(),
            price_locks: KeyedLocks::new(),
            publisher,
        }
    }

    // Products

    pub fn create_product(&self, cmd: NewProduct) -> DomainResult<Product> {
        let product = Product::create(&cmd, Utc::now())?;
        let sku = product.sku().to_string();

        self.sku_locks.with_lock(&sku, || {
            if self.products.find(&|p: &Product| p.sku() == sku)?.is_some() {
                return Err(DomainError::validation(format!("Product with SKU already exists: {sku}")));
            }
            self.products.insert(product.clone())?;
            info!(product_id = %product.id(), sku = %sku, "product created");
            Ok(product)
        })
    }

    pub fn get_product(&self, id: ProductId) -> DomainResult<Product> {
        require(self.products.get(&id)?, "Product", id)
    }

    pub fn get_product_by_sku(&self, sku: &str) -> DomainResult<Product> {
        let found = self.products.find(&|p: &Product| p.sku() == sku)?;
        require(found, "Product", format!("sku={sku}"))
    }

    pub fn list_products(&self) -> DomainResult<Vec<Product>> {
        let mut products = self.products.list()?;
        products.sort_by(|a, b| a.sku().cmp(b.sku()));
        Ok(products)
    }

    pub fn update_product(&self, id: ProductId, update: &ProductUpdate) -> DomainResult<Product> {
        self.product_locks.with_lock(&id, || {
            let current = self.get_product(id)?;
            let next = current.update(update, Utc::now())?;
            self.products.save(next.clone())?;
            info!(product_id = %id, "product updated");
            Ok(next)
        })
    }

    /// Delete a product together with its store prices.
    pub fn delete_product(&self, id: ProductId) -> DomainResult<()> {
        self.product_locks.with_lock(&id, || {
            self.get_product(id)?;
            for price in self.prices.filter(&|p: &StorePrice| p.product_id() == id)? {
                let key = price.key();
                self.price_locks.with_lock(&key, || self.prices.remove(&key))?;
            }
            self.products.remove(&id)?;
            info!(product_id = %id, "product deleted");
            Ok(())
        })
    }

    // Promotions

    pub fn create_promotion(&self, cmd: NewPromotion) -> DomainResult<Promotion> {
        let promotion = Promotion::create(&cmd, Utc::now())?;
        self.promotions.insert(promotion.clone())?;
        info!(
            promotion_id = %promotion.id(),
            promotion_type = promotion.kind().type_name(),
            "promotion created"
        );
        Ok(promotion)
    }

    pub fn get_promotion(&self, id: PromotionId) -> DomainResult<Promotion> {
        require(self.promotions.get(&id)?, "Promotion", id)
    }

    pub fn list_promotions(&self) -> DomainResult<Vec<Promotion>> {
        let mut promotions = self.promotions.list()?;
        promotions.sort_by_key(|p| p.created_at());
        Ok(promotions)
    }

    /// Promotions currently active that apply to `store_id` (scoped or global).
    pub fn active_promotions_for_store(&self, store_id: StoreId, now: DateTime<Utc>) -> DomainResult<Vec<Promotion>> {
        let mut active = self
            .promotions
            .filter(&|p: &Promotion| p.applies_to_store(store_id) && p.is_currently_active(now))?;
        active.sort_by_key(|p| p.created_at());
        Ok(active)
    }

    /// Update a promotion and reprice every store price it is attached to.
    pub fn update_promotion(&self, id: PromotionId, update: &PromotionUpdate) -> DomainResult<Promotion> {
        self.promotion_locks.with_lock(&id, || {
            let current = self.get_promotion(id)?;
            let next = current.update(update)?;
            self.promotions.save(next.clone())?;
            info!(promotion_id = %id, "promotion updated");

            let reason = format!("Promotion updated: {}", next.name());
            self.reprice_attached(id, &reason, |price, now| {
                let previous = price.current_price(Some(&current), now);
                let repriced = price.with_base_price(price.base_price(), Some(&next), now)?;
                let change = PriceChange {
                    previous,
                    current: repriced.current_price(Some(&next), now),
                };
                Ok((repriced, change))
            })?;
            Ok(next)
        })
    }

    /// Delete a promotion, detaching it from every store price first.
    pub fn delete_promotion(&self, id: PromotionId) -> DomainResult<()> {
        self.promotion_locks.with_lock(&id, || {
            let current = self.get_promotion(id)?;
            let reason = format!("Promotion removed: {}", current.name());
            self.reprice_attached(id, &reason, |price, now| {
                let change = PriceChange {
                    previous: price.current_price(Some(&current), now),
                    current: price.base_price(),
                };
                Ok((price.without_promotion(now), change))
            })?;
            self.promotions.remove(&id)?;
            info!(promotion_id = %id, "promotion deleted");
            Ok(())
        })
    }

    // Store prices

    /// Set the base price of a product at a store, creating the store price if
    /// absent. An existing price whose customer-facing value changes publishes
    /// `price.changed`.
    pub fn set_price(&self, product_id: ProductId, store_id: StoreId, base_price: Money) -> DomainResult<StorePrice> {
        let product = self.get_product(product_id)?;
        let key = StorePriceKey { product_id, store_id };

        self.price_locks.with_lock(&key, || {
            let now = Utc::now();
            let Some(current) = self.prices.get(&key)? else {
                let created = StorePrice::new(product_id, store_id, base_price, now)?;
                self.prices.insert(created.clone())?;
                info!(%key, base_price = %created.base_price(), "store price created");
                return Ok(created);
            };

            let promotion = self.attached_promotion(&current)?;
            let next = current.with_base_price(base_price, promotion.as_ref(), now)?;
            self.prices.save(next.clone())?;
            info!(%key, base_price = %next.base_price(), "store price updated");

            let change = PriceChange {
                previous: current.current_price(promotion.as_ref(), now),
                current: next.current_price(promotion.as_ref(), now),
            };
            self.publish_change(&product, &next, change, "Price updated", now);
            Ok(next)
        })
    }

    pub fn get_price(&self, product_id: ProductId, store_id: StoreId) -> DomainResult<StorePrice> {
        let key = StorePriceKey { product_id, store_id };
        require(self.prices.get(&key)?, "StorePrice", key)
    }

    /// Customer-facing price at `now`.
    pub fn current_price(&self, product_id: ProductId, store_id: StoreId, now: DateTime<Utc>) -> DomainResult<Money> {
        let price = self.get_price(product_id, store_id)?;
        let promotion = self.attached_promotion(&price)?;
        Ok(price.current_price(promotion.as_ref(), now))
    }

    pub fn prices_for_store(&self, store_id: StoreId) -> DomainResult<Vec<StorePrice>> {
        let mut prices = self.prices.filter(&|p: &StorePrice| p.store_id() == store_id)?;
        prices.sort_by_key(StorePrice::key);
        Ok(prices)
    }

    pub fn apply_promotion(
        &self,
        product_id: ProductId,
        store_id: StoreId,
        promotion_id: PromotionId,
    ) -> DomainResult<StorePrice> {
        let product = self.get_product(product_id)?;
        let key = StorePriceKey { product_id, store_id };

        // Promotion before price, as in update and delete.
        self.promotion_locks.with_lock(&promotion_id, || {
            let promotion = self.get_promotion(promotion_id)?;
            self.price_locks.with_lock(&key, || {
                let now = Utc::now();
                let current = require(self.prices.get(&key)?, "StorePrice", key)?;
                let previous = current.current_price(self.attached_promotion(&current)?.as_ref(), now);

                let next = current.with_promotion(&promotion, now)?;
                self.prices.save(next.clone())?;
                info!(%key, promotion_id = %promotion_id, "promotion applied");

                let change = PriceChange {
                    previous,
                    current: next.current_price(Some(&promotion), now),
                };
                let reason = format!("Promotion applied: {}", promotion.name());
                self.publish_change(&product, &next, change, &reason, now);
                Ok(next)
            })
        })
    }

    pub fn remove_promotion(&self, product_id: ProductId, store_id: StoreId) -> DomainResult<StorePrice> {
        let product = self.get_product(product_id)?;
        let key = StorePriceKey { product_id, store_id };

        self.price_locks.with_lock(&key, || {
            let now = Utc::now();
            let current = require(self.prices.get(&key)?, "StorePrice", key)?;
            let previous = current.current_price(self.attached_promotion(&current)?.as_ref(), now);

            let next = current.without_promotion(now);
            self.prices.save(next.clone())?;
            info!(%key, "promotion removed");

            let change = PriceChange {
                previous,
                current: next.base_price(),
            };
            self.publish_change(&product, &next, change, "Promotion removed", now);
            Ok(next)
        })
    }

    /// Observe promotion windows at `now`: publish `promotion.started` /
    /// `promotion.ended` for every flip since the last observation, and
    /// `price.changed` for each store price the flip moved. Returns the number
    /// of flips.
    pub fn observe_promotion_windows(
        &self,
        tracker: &mut PromotionActivityTracker,
        now: DateTime<Utc>,
    ) -> DomainResult<usize> {
        let promotions = self.promotions.list()?;
        let flips = tracker.observe(&promotions, now);

        for (store_id, flip) in &flips {
            info!(
                promotion_id = %flip.promotion_id,
                started = flip.started,
                "promotion activity changed"
            );
            self.publisher.publish(*store_id, flip.clone(), now);

            let Some(promotion) = promotions.iter().find(|p| p.id() == flip.promotion_id) else {
                continue;
            };
            let reason = if flip.started {
                format!("Promotion started: {}", promotion.name())
            } else {
                format!("Promotion ended: {}", promotion.name())
            };
            self.reprice_attached(promotion.id(), &reason, |price, _| {
                let base = price.base_price();
                let discounted = price.discounted_price().unwrap_or(base);
                let change = if flip.started {
                    PriceChange {
                        previous: base,
                        current: discounted,
                    }
                } else {
                    PriceChange {
                        previous: discounted,
                        current: base,
                    }
                };
                Ok((price.clone(), change))
            })?;
        }

        debug!(flips = flips.len(), "promotion window sweep finished");
        Ok(flips.len())
    }

    fn attached_promotion(&self, price: &StorePrice) -> DomainResult<Option<Promotion>> {
        match price.promotion_id() {
            Some(id) => self.promotions.get(&id),
            None => Ok(None),
        }
    }

    /// Apply `op` to every store price carrying `promotion_id`, each under its
    /// own price lock, saving the result and publishing the price change.
    fn reprice_attached(
        &self,
        promotion_id: PromotionId,
        reason: &str,
        op: impl Fn(&StorePrice, DateTime<Utc>) -> DomainResult<(StorePrice, PriceChange)>,
    ) -> DomainResult<()> {
        let attached = self
            .prices
            .filter(&|p: &StorePrice| p.promotion_id() == Some(promotion_id))?;

        for stale in attached {
            let key = stale.key();
            self.price_locks.with_lock(&key, || -> DomainResult<()> {
                let now = Utc::now();
                let Some(price) = self.prices.get(&key)? else {
                    return Ok(());
                };
                if price.promotion_id() != Some(promotion_id) {
                    return Ok(());
                }
                let (next, change) = op(&price, now)?;
                if next != price {
                    self.prices.save(next.clone())?;
                }
                if let Some(product) = self.products.get(&key.product_id)? {
                    self.publish_change(&product, &next, change, reason, now);
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn publish_change(&self, product: &Product, price: &StorePrice, change: PriceChange, reason: &str, at: DateTime<Utc>) {
        if !change.is_change() {
            return;
        }
        let event = PriceChangedEvent::new(product, change, reason);
        self.publisher.publish(Some(price.store_id()), event, at);
    }
}

impl core::fmt::Debug for PriceService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PriceService").finish_non_exhaustive()
    }
}
