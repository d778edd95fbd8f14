use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use destore_core::{DomainError, DomainResult, Entity, Money, PromotionId, StoreId};

/// Promotion type with its type-specific parameters.
///
/// The set is closed: every rule that depends on the type matches it
/// exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionKind {
    PercentageDiscount { percentage: Decimal },
    FixedDiscount { amount: Money },
    BuyOneGetOneFree,
    ThreeForTwo,
    /// Delivery-fee waiver; the item price is unchanged.
    FreeDelivery,
}

impl PromotionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            PromotionKind::PercentageDiscount { .. } => "PERCENTAGE_DISCOUNT",
            PromotionKind::FixedDiscount { .. } => "FIXED_DISCOUNT",
            PromotionKind::BuyOneGetOneFree => "BUY_ONE_GET_ONE_FREE",
            PromotionKind::ThreeForTwo => "THREE_FOR_TWO",
            PromotionKind::FreeDelivery => "FREE_DELIVERY",
        }
    }

    fn validate(&self) -> DomainResult<()> {
        match self {
            PromotionKind::PercentageDiscount { percentage } => {
                if *percentage <= Decimal::ZERO || *percentage > Decimal::ONE_HUNDRED {
                    return Err(DomainError::validation(
                        "discount percentage must be greater than 0 and at most 100",
                    ));
                }
            }
            PromotionKind::FixedDiscount { amount } => {
                if !amount.is_positive() {
                    return Err(DomainError::validation("discount amount must be positive"));
                }
            }
            PromotionKind::BuyOneGetOneFree
            | PromotionKind::ThreeForTwo
            | PromotionKind::FreeDelivery => {}
        }
        Ok(())
    }
}

/// A promotion, optionally scoped to one store and bounded in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    id: PromotionId,
    name: String,
    description: Option<String>,
    #[serde(flatten)]
    kind: PromotionKind,
    /// `None` applies to all stores.
    store_id: Option<StoreId>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    active: bool,
    version: u64,
    created_at: DateTime<Utc>,
}

/// Command: create a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPromotion {
    pub name: String,
    pub description: Option<String>,
    pub kind: PromotionKind,
    pub store_id: Option<StoreId>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Command: update a promotion. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<PromotionKind>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

fn validate_window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> DomainResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(DomainError::validation("promotion start date must be before end date"));
        }
    }
    Ok(())
}

impl Promotion {
    pub fn create(cmd: &NewPromotion, at: DateTime<Utc>) -> DomainResult<Self> {
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("promotion name cannot be empty"));
        }
        cmd.kind.validate()?;
        validate_window(cmd.start_date, cmd.end_date)?;

        Ok(Self {
            id: PromotionId::new(),
            name: cmd.name.trim().to_string(),
            description: cmd.description.clone(),
            kind: cmd.kind.clone(),
            store_id: cmd.store_id,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            active: true,
            version: 1,
            created_at: at,
        })
    }

    pub fn update(&self, update: &PromotionUpdate) -> DomainResult<Self> {
        let mut next = self.clone();

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("promotion name cannot be empty"));
            }
            next.name = name.trim().to_string();
        }
        if let Some(description) = &update.description {
            next.description = Some(description.clone());
        }
        if let Some(kind) = &update.kind {
            kind.validate()?;
            next.kind = kind.clone();
        }
        if update.start_date.is_some() {
            next.start_date = update.start_date;
        }
        if update.end_date.is_some() {
            next.end_date = update.end_date;
        }
        if let Some(active) = update.active {
            next.active = active;
        }
        validate_window(next.start_date, next.end_date)?;

        next.version += 1;
        Ok(next)
    }

    /// Active flag set and `now` strictly inside the (possibly open) window.
    pub fn is_currently_active(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.start_date.is_none_or(|start| now > start)
            && self.end_date.is_none_or(|end| now < end)
    }

    /// Global promotions apply everywhere; scoped ones only to their store.
    pub fn applies_to_store(&self, store_id: StoreId) -> bool {
        self.store_id.is_none_or(|scope| scope == store_id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> &PromotionKind {
        &self.kind
    }

    pub fn store_id(&self) -> Option<StoreId> {
        self.store_id
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    pub fn is_active_flag(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for Promotion {
    type Id = PromotionId;

    fn id(&self) -> PromotionId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
