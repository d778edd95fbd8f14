use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use destore_core::{DomainError, DomainResult, Money, StoreId, generate_reference};
use destore_loyalty::{LoyaltyCard, LoyaltyOutcome, NewLoyaltyCard, PointsTransaction};

use crate::config::LoyaltyConfig;
use crate::publisher::EventPublisher;
use crate::services::require;
use crate::store::{EntityStore, KeyedLocks, LedgerLog};

/// Loyalty cards and their points ledger, keyed by card number.
pub struct LoyaltyService {
    cards: Arc<dyn EntityStore<LoyaltyCard>>,
    transactions: Arc<LedgerLog<String, PointsTransaction>>,
    locks: KeyedLocks<String>,
    email_locks: KeyedLocks<String>,
    publisher: EventPublisher,
    config: LoyaltyConfig,
}

impl LoyaltyService {
    pub fn new(
        cards: Arc<dyn EntityStore<LoyaltyCard>>,
        transactions: Arc<LedgerLog<String, PointsTransaction>>,
        publisher: EventPublisher,
        config: LoyaltyConfig,
    ) -> Self {
        Self {
            cards,
            transactions,
            locks: KeyedLocks::new(),
            email_locks: KeyedLocks::new(),
            publisher,
            config,
        }
    }

    /// Open a card; one card per customer email.
    pub fn create_card(&self, cmd: NewLoyaltyCard) -> DomainResult<LoyaltyCard> {
        let email = cmd.customer_email.trim().to_lowercase();

        self.email_locks.with_lock(&email, || {
            if self.cards.find(&|c: &LoyaltyCard| c.customer_email() == email)?.is_some() {
                return Err(DomainError::validation(format!(
                    "Loyalty card already exists for email: {email}"
                )));
            }

            let card = loop {
                let number = generate_reference("LOY");
                if self.cards.get(&number)?.is_none() {
                    break LoyaltyCard::create(&cmd, number, Utc::now())?;
                }
            };
            self.cards.insert(card.clone())?;
            info!(card_number = card.card_number(), "loyalty card created");
            Ok(card)
        })
    }

    /// Award points for a purchase at the configured points-per-pound rate.
    pub fn award_points(
        &self,
        card_number: &str,
        purchase_amount: Money,
        store_id: Option<StoreId>,
        description: &str,
    ) -> DomainResult<LoyaltyCard> {
        let ppp = self.config.points_per_pound;
        self.mutate(card_number, store_id, |card| {
            card.award_points(purchase_amount, ppp, store_id, description, Utc::now())
        })
    }

    pub fn redeem_points(
        &self,
        card_number: &str,
        points: u64,
        store_id: Option<StoreId>,
        description: &str,
    ) -> DomainResult<LoyaltyCard> {
        self.mutate(card_number, store_id, |card| {
            card.redeem_points(points, store_id, description, Utc::now())
        })
    }

    pub fn deactivate_card(&self, card_number: &str) -> DomainResult<LoyaltyCard> {
        let key = card_number.to_string();
        self.locks.with_lock(&key, || {
            let current = require(self.cards.get(&key)?, "LoyaltyCard", &key)?;
            let next = current.deactivate(Utc::now())?;
            self.cards.save(next.clone())?;
            info!(card_number = %key, "loyalty card deactivated");
            Ok(next)
        })
    }

    pub fn get_card(&self, card_number: &str) -> DomainResult<LoyaltyCard> {
        require(self.cards.get(&card_number.to_string())?, "LoyaltyCard", card_number)
    }

    /// Card numbers are the card identity, so this is [`get_card`](Self::get_card).
    pub fn get_card_by_number(&self, card_number: &str) -> DomainResult<LoyaltyCard> {
        self.get_card(card_number)
    }

    pub fn get_card_by_email(&self, email: &str) -> DomainResult<LoyaltyCard> {
        let email = email.trim().to_lowercase();
        let found = self.cards.find(&|c: &LoyaltyCard| c.customer_email() == email)?;
        require(found, "LoyaltyCard", format!("email={email}"))
    }

    pub fn list_cards(&self) -> DomainResult<Vec<LoyaltyCard>> {
        let mut cards = self.cards.list()?;
        cards.sort_by_key(|c| c.created_at());
        Ok(cards)
    }

    /// Points ledger of a card, oldest first.
    pub fn transaction_history(&self, card_number: &str) -> DomainResult<Vec<PointsTransaction>> {
        self.get_card(card_number)?;
        self.transactions.entries(&card_number.to_string())
    }

    fn mutate(
        &self,
        card_number: &str,
        store_id: Option<StoreId>,
        op: impl FnOnce(&LoyaltyCard) -> DomainResult<LoyaltyOutcome>,
    ) -> DomainResult<LoyaltyCard> {
        let key = card_number.to_string();
        self.locks.with_lock(&key, || {
            let current = require(self.cards.get(&key)?, "LoyaltyCard", &key)?;
            let outcome = op(&current)?;
            let Some(transaction) = outcome.transaction else {
                return Ok(outcome.card);
            };

            self.cards.save(outcome.card.clone())?;
            if let Err(err) = self.transactions.append(key.clone(), transaction) {
                self.cards.save(current)?;
                return Err(err);
            }

            let card = outcome.card;
            info!(
                card_number = %key,
                balance = card.points_balance(),
                tier = ?card.tier(),
                "loyalty balance updated"
            );

            let now = Utc::now();
            if let Some(earned) = outcome.points_earned {
                self.publisher.publish(store_id, earned, now);
            }
            if let Some(changed) = outcome.tier_changed {
                info!(
                    card_number = %key,
                    previous = ?changed.previous_tier,
                    new = ?changed.new_tier,
                    "loyalty tier changed"
                );
                self.publisher.publish(store_id, changed, now);
            }
            Ok(card)
        })
    }
}

impl core::fmt::Debug for LoyaltyService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoyaltyService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
