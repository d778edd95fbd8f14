//! Decision policy of the simulated lending partner.
//!
//! The policy is deterministic given its random source, so tests (and seeded
//! runtimes) reproduce the same decisions. Latency emulation is sampled here
//! but slept by the adapter that drives the policy.

use std::time::Duration;

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use destore_core::{DomainError, DomainResult, Money};
use destore_core::money::round_half_up;

pub const APPROVAL_REASON: &str = "Application meets lending criteria";

pub const DECLINE_REASONS: [&str; 4] = [
    "Credit score below threshold",
    "Insufficient income verification",
    "Existing debt levels too high",
    "Unable to verify employment",
];

/// What the lender is asked to decide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub application_reference: String,
    pub amount: Money,
    pub term_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Approved {
        term_months: u32,
        interest_rate: Decimal,
        monthly_payment: Money,
    },
    Declined,
}

/// The lender's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinanceDecision {
    pub external_reference: String,
    pub outcome: DecisionOutcome,
    pub reason: String,
}

impl FinanceDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self.outcome, DecisionOutcome::Approved { .. })
    }
}

/// `amount × (1 + rate/100) / term`, rounded half-up to pennies.
pub fn monthly_payment(amount: Money, interest_rate: Decimal, term_months: u32) -> DomainResult<Money> {
    let factor = interest_rate
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|r| r.checked_add(Decimal::ONE))
        .ok_or_else(DomainError::out_of_range)?;
    amount
        .amount()
        .checked_mul(factor)
        .and_then(|total| total.checked_div(Decimal::from(term_months.max(1))))
        .map(|monthly| Money::new(round_half_up(monthly, 2)))
        .ok_or_else(DomainError::out_of_range)
}

/// Approval policy: auto-approve small amounts, otherwise approve with a
/// fixed probability.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionPolicy {
    pub auto_approve_threshold: Money,
    /// Probability in `[0, 1]`.
    pub approval_rate: f64,
    pub interest_rate: Decimal,
    pub default_term_months: u32,
    pub min_latency: Duration,
    pub max_latency: Duration,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            auto_approve_threshold: Money::new(Decimal::from(1000)),
            approval_rate: 0.7,
            interest_rate: Decimal::new(59, 1),
            default_term_months: 12,
            min_latency: Duration::from_millis(500),
            max_latency: Duration::from_millis(1500),
        }
    }
}

impl DecisionPolicy {
    /// Fails only when the approved repayment cannot be computed.
    pub fn decide<R: Rng + ?Sized>(&self, request: &DecisionRequest, rng: &mut R) -> DomainResult<FinanceDecision> {
        let external_reference = format!("ENA-{:08X}", rng.r#gen::<u32>());

        let approved = request.amount <= self.auto_approve_threshold
            || rng.r#gen::<f64>() < self.approval_rate;

        if approved {
            let term_months = request.term_months.unwrap_or(self.default_term_months);
            Ok(FinanceDecision {
                external_reference,
                outcome: DecisionOutcome::Approved {
                    term_months,
                    interest_rate: self.interest_rate,
                    monthly_payment: monthly_payment(request.amount, self.interest_rate, term_months)?,
                },
                reason: APPROVAL_REASON.to_string(),
            })
        } else {
            let reason = DECLINE_REASONS[rng.gen_range(0..DECLINE_REASONS.len())];
            Ok(FinanceDecision {
                external_reference,
                outcome: DecisionOutcome::Declined,
                reason: reason.to_string(),
            })
        }
    }

    /// Emulated network latency, uniform in `[min_latency, max_latency]`.
    pub fn sample_latency<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min_latency.as_millis() as u64;
        let max = self.max_latency.as_millis() as u64;
        if max <= min {
            return self.min_latency;
        }
        Duration::from_millis(rng.gen_range(min..=max))
    }
}
