use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use destore_core::{DomainError, DomainResult, Entity, Money, StoreId};

use crate::events::{PointsEarnedEvent, TierChangedEvent};
use crate::transaction::{PointsTransaction, TransactionType};

/// Tier ladder, ordered from lowest to highest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    /// Highest tier whose threshold `points` reaches.
    pub fn for_points(points: u64) -> Self {
        [
            LoyaltyTier::Platinum,
            LoyaltyTier::Gold,
            LoyaltyTier::Silver,
        ]
        .into_iter()
        .find(|tier| points >= tier.threshold())
        .unwrap_or(LoyaltyTier::Bronze)
    }

    pub fn threshold(self) -> u64 {
        match self {
            LoyaltyTier::Bronze => 0,
            LoyaltyTier::Silver => 1_000,
            LoyaltyTier::Gold => 5_000,
            LoyaltyTier::Platinum => 10_000,
        }
    }
}

/// Points for a purchase: `amount × points_per_pound`, truncated.
///
/// A total that leaves the decimal range or exceeds `u64` is a `Validation`
/// error rather than zero points.
pub fn points_for_purchase(amount: Money, points_per_pound: u32) -> DomainResult<u64> {
    amount
        .amount()
        .checked_mul(Decimal::from(points_per_pound))
        .and_then(|points| points.trunc().to_u64())
        .ok_or_else(DomainError::out_of_range)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyCard {
    card_number: String,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    points_balance: u64,
    lifetime_points: u64,
    tier: LoyaltyTier,
    active: bool,
    version: u64,
    created_at: DateTime<Utc>,
    tier_changed_at: Option<DateTime<Utc>>,
    last_activity_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLoyaltyCard {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
}

/// Result of a balance change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoyaltyOutcome {
    pub card: LoyaltyCard,
    pub transaction: Option<PointsTransaction>,
    pub points_earned: Option<PointsEarnedEvent>,
    pub tier_changed: Option<TierChangedEvent>,
}

impl LoyaltyCard {
    /// Open a BRONZE card with a zero balance. Email uniqueness is checked by
    /// the caller.
    pub fn create(cmd: &NewLoyaltyCard, card_number: String, at: DateTime<Utc>) -> DomainResult<Self> {
        if cmd.customer_name.trim().is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if cmd.customer_email.trim().is_empty() || !cmd.customer_email.contains('@') {
            return Err(DomainError::validation("a valid customer email is required"));
        }

        Ok(Self {
            card_number,
            customer_name: cmd.customer_name.trim().to_string(),
            customer_email: cmd.customer_email.trim().to_lowercase(),
            customer_phone: cmd.customer_phone.clone(),
            points_balance: 0,
            lifetime_points: 0,
            tier: LoyaltyTier::Bronze,
            active: true,
            version: 1,
            created_at: at,
            tier_changed_at: None,
            last_activity_at: None,
        })
    }

    pub fn award_points(
        &self,
        purchase_amount: Money,
        points_per_pound: u32,
        store_id: Option<StoreId>,
        description: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<LoyaltyOutcome> {
        self.ensure_active()?;
        if !purchase_amount.is_positive() {
            return Err(DomainError::validation("purchase amount must be positive"));
        }

        let points = points_for_purchase(purchase_amount, points_per_pound)?;
        if points == 0 {
            return Ok(LoyaltyOutcome {
                card: self.clone(),
                transaction: None,
                points_earned: None,
                tier_changed: None,
            });
        }

        let (Some(balance), Some(lifetime), Ok(delta)) = (
            self.points_balance.checked_add(points),
            self.lifetime_points.checked_add(points),
            i64::try_from(points),
        ) else {
            return Err(DomainError::validation("points balance out of range"));
        };

        let mut next = self.next(at);
        next.points_balance = balance;
        next.lifetime_points = lifetime;
        let tier_changed = next.recompute_tier(self.tier, at);

        let transaction = PointsTransaction {
            card_number: self.card_number.clone(),
            transaction_type: TransactionType::Earned,
            points: delta,
            previous_balance: self.points_balance,
            new_balance: next.points_balance,
            purchase_amount: Some(purchase_amount),
            store_id,
            description: description.to_string(),
            occurred_at: at,
        };
        let earned = PointsEarnedEvent {
            card_number: self.card_number.clone(),
            points_earned: points,
            previous_balance: self.points_balance,
            new_balance: next.points_balance,
            purchase_amount,
            tier: next.tier,
        };

        Ok(LoyaltyOutcome {
            card: next,
            transaction: Some(transaction),
            points_earned: Some(earned),
            tier_changed,
        })
    }

    pub fn redeem_points(
        &self,
        points: u64,
        store_id: Option<StoreId>,
        description: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<LoyaltyOutcome> {
        self.ensure_active()?;
        if points == 0 {
            return Err(DomainError::validation("points to redeem must be positive"));
        }
        if points > self.points_balance {
            return Err(DomainError::validation(format!(
                "Insufficient points. Available: {}, Requested: {}",
                self.points_balance, points
            )));
        }
        let delta = i64::try_from(points)
            .map_err(|_| DomainError::validation("points to redeem out of range"))?;

        let mut next = self.next(at);
        next.points_balance = self.points_balance - points;
        let tier_changed = next.recompute_tier(self.tier, at);

        let transaction = PointsTransaction {
            card_number: self.card_number.clone(),
            transaction_type: TransactionType::Redeemed,
            points: -delta,
            previous_balance: self.points_balance,
            new_balance: next.points_balance,
            purchase_amount: None,
            store_id,
            description: description.to_string(),
            occurred_at: at,
        };

        Ok(LoyaltyOutcome {
            card: next,
            transaction: Some(transaction),
            points_earned: None,
            tier_changed,
        })
    }

    pub fn deactivate(&self, at: DateTime<Utc>) -> DomainResult<Self> {
        self.ensure_active()?;
        let mut next = self.next(at);
        next.active = false;
        Ok(next)
    }

    fn ensure_active(&self) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::illegal_state(format!(
                "loyalty card {} is not active",
                self.card_number
            )));
        }
        Ok(())
    }

    fn next(&self, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next.last_activity_at = Some(at);
        next
    }

    fn recompute_tier(&mut self, previous: LoyaltyTier, at: DateTime<Utc>) -> Option<TierChangedEvent> {
        self.tier = LoyaltyTier::for_points(self.points_balance);
        if self.tier == previous {
            return None;
        }
        self.tier_changed_at = Some(at);
        Some(TierChangedEvent {
            card_number: self.card_number.clone(),
            customer_name: self.customer_name.clone(),
            previous_tier: previous,
            new_tier: self.tier,
            points_balance: self.points_balance,
        })
    }

    pub fn card_number(&self) -> &str {
        &self.card_number
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn customer_phone(&self) -> Option<&str> {
        self.customer_phone.as_deref()
    }

    pub fn points_balance(&self) -> u64 {
        self.points_balance
    }

    pub fn lifetime_points(&self) -> u64 {
        self.lifetime_points
    }

    pub fn tier(&self) -> LoyaltyTier {
        self.tier
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn tier_changed_at(&self) -> Option<DateTime<Utc>> {
        self.tier_changed_at
    }
}

impl Entity for LoyaltyCard {
    type Id = String;

    fn id(&self) -> String {
        self.card_number.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }
}
