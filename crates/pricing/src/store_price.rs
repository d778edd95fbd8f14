use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use destore_core::{DomainError, DomainResult, Entity, Money, ProductId, PromotionId, StoreId};

use crate::discount::apply_discount;
use crate::promotion::Promotion;

/// Unique key of a store price: one price per product per store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePriceKey {
    pub product_id: ProductId,
    pub store_id: StoreId,
}

impl core::fmt::Display for StorePriceKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "productId={}, storeId={}", self.product_id, self.store_id)
    }
}

/// Price of a product at one store.
///
/// `discounted_price` is kept in step with the attached promotion; whether it
/// is the customer-facing price depends on the promotion's activity at read
/// time (see [`StorePrice::current_price`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePrice {
    product_id: ProductId,
    store_id: StoreId,
    base_price: Money,
    discounted_price: Option<Money>,
    promotion_id: Option<PromotionId>,
    version: u64,
    updated_at: DateTime<Utc>,
}

/// Customer-facing price before and after a mutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PriceChange {
    pub previous: Money,
    pub current: Money,
}

impl PriceChange {
    pub fn is_change(&self) -> bool {
        self.previous != self.current
    }
}

fn ensure_valid_base(base: Money) -> DomainResult<()> {
    if base.is_negative() {
        return Err(DomainError::validation("base price cannot be negative"));
    }
    Ok(())
}

impl StorePrice {
    pub fn new(
        product_id: ProductId,
        store_id: StoreId,
        base_price: Money,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_valid_base(base_price)?;
        Ok(Self {
            product_id,
            store_id,
            base_price: base_price.round_half_up(),
            discounted_price: None,
            promotion_id: None,
            version: 1,
            updated_at: at,
        })
    }

    pub fn key(&self) -> StorePriceKey {
        StorePriceKey {
            product_id: self.product_id,
            store_id: self.store_id,
        }
    }

    /// Discounted price if `promotion` is the attached one and currently
    /// active, otherwise the base price.
    pub fn current_price(&self, promotion: Option<&Promotion>, now: DateTime<Utc>) -> Money {
        match (self.discounted_price, promotion) {
            (Some(discounted), Some(promo))
                if Some(promo.id()) == self.promotion_id && promo.is_currently_active(now) =>
            {
                discounted
            }
            _ => self.base_price,
        }
    }

    /// Set a new base price, recomputing the discount of the attached promotion.
    pub fn with_base_price(
        &self,
        base_price: Money,
        promotion: Option<&Promotion>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_valid_base(base_price)?;
        let mut next = self.clone();
        next.base_price = base_price.round_half_up();
        next.discounted_price = match promotion {
            Some(promo) if Some(promo.id()) == self.promotion_id => {
                Some(apply_discount(next.base_price, promo.kind())?)
            }
            _ => None,
        };
        if next.discounted_price.is_none() {
            next.promotion_id = None;
        }
        next.touch(at);
        Ok(next)
    }

    /// Attach a promotion. Store-scoped promotions only attach to their store.
    pub fn with_promotion(&self, promotion: &Promotion, at: DateTime<Utc>) -> DomainResult<Self> {
        if !promotion.applies_to_store(self.store_id) {
            return Err(DomainError::validation(format!(
                "promotion {} does not apply to store {}",
                promotion.id(),
                self.store_id
            )));
        }
        let mut next = self.clone();
        next.promotion_id = Some(promotion.id());
        next.discounted_price = Some(apply_discount(self.base_price, promotion.kind())?);
        next.touch(at);
        Ok(next)
    }

    pub fn without_promotion(&self, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.promotion_id = None;
        next.discounted_price = None;
        next.touch(at);
        next
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = at;
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn base_price(&self) -> Money {
        self.base_price
    }

    pub fn discounted_price(&self) -> Option<Money> {
        self.discounted_price
    }

    pub fn promotion_id(&self) -> Option<PromotionId> {
        self.promotion_id
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for StorePrice {
    type Id = StorePriceKey;

    fn id(&self) -> StorePriceKey {
        self.key()
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promotion::{NewPromotion, PromotionKind};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn promo(kind: PromotionKind, store_id: Option<StoreId>) -> Promotion {
        Promotion::create(
            &NewPromotion {
                name: "promo".to_string(),
                description: None,
                kind,
                store_id,
                start_date: None,
                end_date: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn price_at(store: u64, base: Money) -> StorePrice {
        StorePrice::new(ProductId::new(), StoreId::new(store), base, Utc::now()).unwrap()
    }

    #[test]
    fn attaching_promotion_to_out_of_range_price_is_rejected() {
        let p = price_at(1, Money::new(Decimal::MAX));
        let err = p
            .with_promotion(&promo(PromotionKind::ThreeForTwo, None), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(p.promotion_id(), None);
    }

    #[test]
    fn current_price_uses_discount_only_while_promotion_active() {
        let base = Money::new(dec!(20.00));
        let now = Utc::now();
        let p = promo(PromotionKind::BuyOneGetOneFree, None);
        let sp = price_at(1, base).with_promotion(&p, now).unwrap();

        assert_eq!(sp.current_price(Some(&p), now), Money::new(dec!(10.00)));

        let ended = p
            .update(&crate::promotion::PromotionUpdate {
                end_date: Some(now),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(sp.current_price(Some(&ended), now + Duration::seconds(1)), base);
        assert_eq!(sp.current_price(None, now), base);
    }

    #[test]
    fn scoped_promotion_only_attaches_to_its_store() {
        let p = promo(PromotionKind::ThreeForTwo, Some(StoreId::new(9)));
        let err = price_at(1, Money::new(dec!(3))).with_promotion(&p, Utc::now()).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }
        assert!(price_at(9, Money::new(dec!(3))).with_promotion(&p, Utc::now()).is_ok());
    }

    #[test]
    fn new_base_price_recomputes_discount() {
        let now = Utc::now();
        let p = promo(PromotionKind::PercentageDiscount { percentage: dec!(10) }, None);
        let sp = price_at(1, Money::new(dec!(100))).with_promotion(&p, now).unwrap();

        let repriced = sp.with_base_price(Money::new(dec!(50)), Some(&p), now).unwrap();
        assert_eq!(repriced.discounted_price(), Some(Money::new(dec!(45.00))));
        assert_eq!(repriced.current_price(Some(&p), now), Money::new(dec!(45.00)));
        assert_eq!(repriced.version(), 3);
    }

    #[test]
    fn negative_base_price_is_rejected() {
        let err = StorePrice::new(ProductId::new(), StoreId::new(1), Money::new(dec!(-1)), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn removing_promotion_restores_base() {
        let now = Utc::now();
        let p = promo(PromotionKind::BuyOneGetOneFree, None);
        let sp = price_at(1, Money::new(dec!(8))).with_promotion(&p, now).unwrap();
        let plain = sp.without_promotion(now);
        assert_eq!(plain.promotion_id(), None);
        assert_eq!(plain.current_price(Some(&p), now), Money::new(dec!(8)));
    }
}
