use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use destore_core::{ProductId, StoreId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    StockIn,
    StockOut,
    Adjustment,
    Transfer,
    Reserved,
    Released,
}

/// Append-only ledger entry, one per quantity-affecting mutation.
///
/// `quantity` is the signed delta for on-hand changes; for `Reserved` and
/// `Released` it is the number of units (re)allocated and the on-hand snapshot
/// is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub previous_quantity: u32,
    pub new_quantity: u32,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}
