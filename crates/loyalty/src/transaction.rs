use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use destore_core::{Money, StoreId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Earned,
    Redeemed,
}

/// Append-only points ledger entry. `points` is signed (negative on redeem).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsTransaction {
    pub card_number: String,
    pub transaction_type: TransactionType,
    pub points: i64,
    pub previous_balance: u64,
    pub new_balance: u64,
    pub purchase_amount: Option<Money>,
    pub store_id: Option<StoreId>,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}
