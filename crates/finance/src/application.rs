use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use destore_core::{ApplicationId, DomainError, DomainResult, Entity, Money, StoreId};

use crate::events::FinanceDecisionEvent;
use crate::simulator::{DecisionOutcome, DecisionRequest, FinanceDecision};

/// Longest repayment term accepted from customers.
pub const MAX_TERM_MONTHS: u32 = 120;

/// Lifecycle of a finance application.
///
/// ```text
/// PENDING -> SUBMITTED -> APPROVED | DECLINED | ERROR
/// PENDING | SUBMITTED | UNDER_REVIEW -> CANCELLED
/// ERROR -> SUBMITTED            (resubmission)
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinanceStatus {
    Pending,
    Submitted,
    UnderReview,
    Approved,
    Declined,
    Cancelled,
    Error,
}

impl FinanceStatus {
    /// Terminal states that can never be submitted again.
    pub fn is_decided(self) -> bool {
        matches!(
            self,
            FinanceStatus::Approved | FinanceStatus::Declined | FinanceStatus::Cancelled
        )
    }

    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            FinanceStatus::Pending | FinanceStatus::Submitted | FinanceStatus::UnderReview
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FinanceStatus::Pending => "PENDING",
            FinanceStatus::Submitted => "SUBMITTED",
            FinanceStatus::UnderReview => "UNDER_REVIEW",
            FinanceStatus::Approved => "APPROVED",
            FinanceStatus::Declined => "DECLINED",
            FinanceStatus::Cancelled => "CANCELLED",
            FinanceStatus::Error => "ERROR",
        }
    }
}

impl core::fmt::Display for FinanceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceApplication {
    id: ApplicationId,
    reference: String,
    store_id: StoreId,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    order_reference: Option<String>,
    amount: Money,
    requested_term_months: Option<u32>,
    term_months: Option<u32>,
    interest_rate: Option<Decimal>,
    monthly_payment: Option<Money>,
    status: FinanceStatus,
    decision_reason: Option<String>,
    external_reference: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    decided_at: Option<DateTime<Utc>>,
}

/// Command: open an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFinanceApplication {
    pub store_id: StoreId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub order_reference: Option<String>,
    pub amount: Money,
    pub term_months: Option<u32>,
}

impl FinanceApplication {
    /// Validate and open a PENDING application under `reference`.
    pub fn create(cmd: &NewFinanceApplication, reference: String, at: DateTime<Utc>) -> DomainResult<Self> {
        if cmd.customer_name.trim().is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if cmd.customer_email.trim().is_empty() || !cmd.customer_email.contains('@') {
            return Err(DomainError::validation("a valid customer email is required"));
        }
        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("amount must be positive"));
        }
        if let Some(term) = cmd.term_months {
            if term == 0 || term > MAX_TERM_MONTHS {
                return Err(DomainError::validation(format!(
                    "term must be between 1 and {MAX_TERM_MONTHS} months"
                )));
            }
        }

        Ok(Self {
            id: ApplicationId::new(),
            reference,
            store_id: cmd.store_id,
            customer_name: cmd.customer_name.trim().to_string(),
            customer_email: cmd.customer_email.trim().to_string(),
            customer_phone: cmd.customer_phone.clone(),
            order_reference: cmd.order_reference.clone(),
            amount: cmd.amount.round_half_up(),
            requested_term_months: cmd.term_months,
            term_months: None,
            interest_rate: None,
            monthly_payment: None,
            status: FinanceStatus::Pending,
            decision_reason: None,
            external_reference: None,
            version: 1,
            created_at: at,
            submitted_at: None,
            decided_at: None,
        })
    }

    /// Move to SUBMITTED. Decided applications are rejected unchanged.
    ///
    /// Resubmitting from ERROR clears the previous failure.
    pub fn submit(&self, at: DateTime<Utc>) -> DomainResult<Self> {
        if self.status.is_decided() {
            return Err(DomainError::illegal_state(format!(
                "Application {} has already been {}",
                self.reference, self.status
            )));
        }

        let mut next = self.next();
        next.status = FinanceStatus::Submitted;
        next.submitted_at = Some(at);
        next.decision_reason = None;
        Ok(next)
    }

    /// What to ask the lender for this application.
    pub fn decision_request(&self) -> DecisionRequest {
        DecisionRequest {
            application_reference: self.reference.clone(),
            amount: self.amount,
            term_months: self.requested_term_months,
        }
    }

    /// Apply the lender's decision to a SUBMITTED application.
    pub fn record_decision(&self, decision: &FinanceDecision, at: DateTime<Utc>) -> DomainResult<Self> {
        self.ensure_submitted("record a decision for")?;

        let mut next = self.next();
        next.external_reference = Some(decision.external_reference.clone());
        next.decision_reason = Some(decision.reason.clone());
        next.decided_at = Some(at);
        match &decision.outcome {
            DecisionOutcome::Approved {
                term_months,
                interest_rate,
                monthly_payment,
            } => {
                next.status = FinanceStatus::Approved;
                next.term_months = Some(*term_months);
                next.interest_rate = Some(*interest_rate);
                next.monthly_payment = Some(*monthly_payment);
            }
            DecisionOutcome::Declined => {
                next.status = FinanceStatus::Declined;
            }
        }
        Ok(next)
    }

    /// Compensating transition when the lender call fails, times out or is
    /// cancelled by the caller.
    pub fn record_failure(&self, cause: &str, at: DateTime<Utc>) -> DomainResult<Self> {
        self.ensure_submitted("record a failure for")?;

        let mut next = self.next();
        next.status = FinanceStatus::Error;
        next.decision_reason = Some(format!("System error: {cause}"));
        next.decided_at = Some(at);
        Ok(next)
    }

    pub fn cancel(&self, at: DateTime<Utc>) -> DomainResult<Self> {
        if !self.status.is_cancellable() {
            return Err(DomainError::illegal_state(format!(
                "Application {} cannot be cancelled in status {}",
                self.reference, self.status
            )));
        }

        let mut next = self.next();
        next.status = FinanceStatus::Cancelled;
        next.decided_at = Some(at);
        Ok(next)
    }

    /// The `finance.decision` event for APPROVED/DECLINED applications.
    pub fn decision_event(&self) -> Option<FinanceDecisionEvent> {
        match self.status {
            FinanceStatus::Approved | FinanceStatus::Declined => Some(FinanceDecisionEvent {
                application_id: self.id,
                application_reference: self.reference.clone(),
                customer_name: self.customer_name.clone(),
                customer_email: self.customer_email.clone(),
                amount: self.amount,
                status: self.status,
                decision_reason: self.decision_reason.clone().unwrap_or_default(),
                approved_amount: (self.status == FinanceStatus::Approved).then_some(self.amount),
                term_months: self.term_months,
                monthly_payment: self.monthly_payment,
                interest_rate: self.interest_rate,
                external_reference: self.external_reference.clone(),
            }),
            _ => None,
        }
    }

    fn ensure_submitted(&self, action: &str) -> DomainResult<()> {
        if self.status != FinanceStatus::Submitted {
            return Err(DomainError::illegal_state(format!(
                "cannot {action} application {} in status {}",
                self.reference, self.status
            )));
        }
        Ok(())
    }

    fn next(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
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

    pub fn order_reference(&self) -> Option<&str> {
        self.order_reference.as_deref()
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn term_months(&self) -> Option<u32> {
        self.term_months
    }

    pub fn interest_rate(&self) -> Option<Decimal> {
        self.interest_rate
    }

    pub fn monthly_payment(&self) -> Option<Money> {
        self.monthly_payment
    }

    pub fn status(&self) -> FinanceStatus {
        self.status
    }

    pub fn decision_reason(&self) -> Option<&str> {
        self.decision_reason.as_deref()
    }

    pub fn external_reference(&self) -> Option<&str> {
        self.external_reference.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }
}

impl Entity for FinanceApplication {
    type Id = ApplicationId;

    fn id(&self) -> ApplicationId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
