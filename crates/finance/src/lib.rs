//! Finance domain: buy-now-pay-later applications and the decision policy of
//! the simulated lending partner.

pub mod application;
pub mod events;
pub mod simulator;

pub use application::{FinanceApplication, FinanceStatus, NewFinanceApplication};
pub use events::FinanceDecisionEvent;
pub use simulator::{
    DecisionOutcome, DecisionPolicy, DecisionRequest, FinanceDecision, monthly_payment,
};
