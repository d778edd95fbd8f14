use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use destore_core::money::round_half_up;
use destore_core::{Entity, Money, ProductId, PromotionId};
use destore_events::Event;
use destore_events::topics::{PRICE_CHANGED, PROMOTION_ENDED, PROMOTION_STARTED, sources};

use crate::product::Product;
use crate::promotion::Promotion;
use crate::store_price::PriceChange;

/// `price.changed`: the customer-facing price of a product at a store changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChangedEvent {
    pub product_id: ProductId,
    pub product_sku: String,
    pub product_name: String,
    pub previous_price: Money,
    pub new_price: Money,
    pub change_amount: Money,
    pub change_percentage: Decimal,
    pub reason: String,
}

impl PriceChangedEvent {
    pub fn new(product: &Product, change: PriceChange, reason: impl Into<String>) -> Self {
        let change_amount = change.current - change.previous;
        let change_percentage = if change.previous.amount().is_zero() {
            Decimal::ZERO
        } else {
            round_half_up(
                change_amount.amount() / change.previous.amount() * Decimal::ONE_HUNDRED,
                2,
            )
        };

        Self {
            product_id: product.id(),
            product_sku: product.sku().to_string(),
            product_name: product.name().to_string(),
            previous_price: change.previous,
            new_price: change.current,
            change_amount,
            change_percentage,
            reason: reason.into(),
        }
    }
}

impl Event for PriceChangedEvent {
    fn event_type(&self) -> &'static str {
        PRICE_CHANGED
    }

    fn source(&self) -> &'static str {
        sources::PRICE
    }
}

/// `promotion.started` / `promotion.ended`: a promotion's derived activity flipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionActivityChanged {
    pub promotion_id: PromotionId,
    pub promotion_name: String,
    pub promotion_type: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub started: bool,
}

impl PromotionActivityChanged {
    pub fn new(promotion: &Promotion, started: bool) -> Self {
        Self {
            promotion_id: promotion.id(),
            promotion_name: promotion.name().to_string(),
            promotion_type: promotion.kind().type_name().to_string(),
            start_date: promotion.start_date(),
            end_date: promotion.end_date(),
            started,
        }
    }
}

impl Event for PromotionActivityChanged {
    fn event_type(&self) -> &'static str {
        if self.started { PROMOTION_STARTED } else { PROMOTION_ENDED }
    }

    fn source(&self) -> &'static str {
        sources::PRICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::NewProduct;
    use rust_decimal_macros::dec;

    fn product() -> Product {
        Product::create(
            &NewProduct {
                sku: "SKU-9".to_string(),
                name: "Toaster".to_string(),
                description: None,
                category: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn computes_change_amount_and_percentage() {
        let ev = PriceChangedEvent::new(
            &product(),
            PriceChange {
                previous: Money::new(dec!(20.00)),
                current: Money::new(dec!(15.00)),
            },
            "Price updated",
        );
        assert_eq!(ev.change_amount, Money::new(dec!(-5.00)));
        assert_eq!(ev.change_percentage, dec!(-25.00));
        assert_eq!(ev.routing_key(), "price.changed");
    }

    #[test]
    fn percentage_is_zero_when_previous_price_was_zero() {
        let ev = PriceChangedEvent::new(
            &product(),
            PriceChange {
                previous: Money::ZERO,
                current: Money::new(dec!(3.50)),
            },
            "Price updated",
        );
        assert_eq!(ev.change_percentage, Decimal::ZERO);
        assert_eq!(ev.change_amount, Money::new(dec!(3.50)));
    }
}
