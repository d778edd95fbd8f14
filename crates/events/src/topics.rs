//! Exchange, routing keys and queue names.

/// The single topic exchange carrying every event type.
pub const DESTORE_EXCHANGE: &str = "destore.events";

pub const INVENTORY_LOW_STOCK: &str = "inventory.low-stock";
pub const INVENTORY_OUT_OF_STOCK: &str = "inventory.out-of-stock";

pub const PRICE_CHANGED: &str = "price.changed";
pub const PROMOTION_STARTED: &str = "promotion.started";
pub const PROMOTION_ENDED: &str = "promotion.ended";

pub const FINANCE_DECISION: &str = "finance.decision";

pub const LOYALTY_POINTS_EARNED: &str = "loyalty.points.earned";
pub const LOYALTY_TIER_CHANGED: &str = "loyalty.tier.changed";

/// Durable queue feeding low/out-of-stock alerts to the notification service.
pub const NOTIFICATION_LOW_STOCK_QUEUE: &str = "destore.notifications.lowstock";
/// Durable queue feeding finance decisions to the notification service.
pub const NOTIFICATION_FINANCE_QUEUE: &str = "destore.notifications.finance";

/// Service names used as the envelope `source`.
pub mod sources {
    pub const INVENTORY: &str = "inventory-service";
    pub const PRICE: &str = "price-service";
    pub const FINANCE: &str = "finance-gateway-service";
    pub const LOYALTY: &str = "loyalty-service";
}
