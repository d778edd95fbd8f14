//! Price domain: products, promotions and per-store prices.
//!
//! Pure, deterministic logic (no IO, no clocks). Callers pass the current time
//! and persist the returned snapshots.

pub mod activity;
pub mod discount;
pub mod events;
pub mod product;
pub mod promotion;
pub mod store_price;

pub use activity::PromotionActivityTracker;
pub use discount::{apply_discount, price};
pub use events::{PriceChangedEvent, PromotionActivityChanged};
pub use product::{NewProduct, Product, ProductUpdate};
pub use promotion::{NewPromotion, Promotion, PromotionKind, PromotionUpdate};
pub use store_price::{PriceChange, StorePrice, StorePriceKey};
