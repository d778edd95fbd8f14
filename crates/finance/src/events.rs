use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use destore_core::{ApplicationId, Money};
use destore_events::Event;
use destore_events::topics::{FINANCE_DECISION, sources};

use crate::application::FinanceStatus;

/// `finance.decision`: an application was APPROVED or DECLINED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceDecisionEvent {
    pub application_id: ApplicationId,
    pub application_reference: String,
    pub customer_name: String,
    pub customer_email: String,
    pub amount: Money,
    pub status: FinanceStatus,
    pub decision_reason: String,
    pub approved_amount: Option<Money>,
    pub term_months: Option<u32>,
    pub monthly_payment: Option<Money>,
    pub interest_rate: Option<Decimal>,
    pub external_reference: Option<String>,
}

impl FinanceDecisionEvent {
    pub fn is_approved(&self) -> bool {
        self.status == FinanceStatus::Approved
    }
}

impl Event for FinanceDecisionEvent {
    fn event_type(&self) -> &'static str {
        FINANCE_DECISION
    }

    fn source(&self) -> &'static str {
        sources::FINANCE
    }
}
