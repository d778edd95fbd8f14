use serde::{Deserialize, Serialize};

use destore_core::Money;
use destore_events::Event;
use destore_events::topics::{LOYALTY_POINTS_EARNED, LOYALTY_TIER_CHANGED, sources};

use crate::card::LoyaltyTier;

/// `loyalty.points.earned`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsEarnedEvent {
    pub card_number: String,
    pub points_earned: u64,
    pub previous_balance: u64,
    pub new_balance: u64,
    pub purchase_amount: Money,
    pub tier: LoyaltyTier,
}

impl Event for PointsEarnedEvent {
    fn event_type(&self) -> &'static str {
        LOYALTY_POINTS_EARNED
    }

    fn source(&self) -> &'static str {
        sources::LOYALTY
    }
}

/// `loyalty.tier.changed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierChangedEvent {
    pub card_number: String,
    pub customer_name: String,
    pub previous_tier: LoyaltyTier,
    pub new_tier: LoyaltyTier,
    pub points_balance: u64,
}

impl Event for TierChangedEvent {
    fn event_type(&self) -> &'static str {
        LOYALTY_TIER_CHANGED
    }

    fn source(&self) -> &'static str {
        sources::LOYALTY
    }
}
