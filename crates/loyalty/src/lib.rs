//! Loyalty domain: cards, the tier ladder and the points ledger.

pub mod card;
pub mod events;
pub mod transaction;

pub use card::{LoyaltyCard, LoyaltyOutcome, LoyaltyTier, NewLoyaltyCard, points_for_purchase};
pub use events::{PointsEarnedEvent, TierChangedEvent};
pub use transaction::{PointsTransaction, TransactionType};
