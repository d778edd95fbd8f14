//! Rendering of workflow events into manager notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use destore_core::{DomainError, DomainResult, StoreId};
use destore_events::EventEnvelope;
use destore_finance::FinanceDecisionEvent;
use destore_inventory::LowStockEvent;

use crate::notification::{Channel, NewNotification, Notification, NotificationType, Priority};

/// Who receives store alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientSettings {
    pub recipient: String,
    pub email_domain: String,
}

impl Default for RecipientSettings {
    fn default() -> Self {
        Self {
            recipient: "Store Manager".to_string(),
            email_domain: "destore.com".to_string(),
        }
    }
}

impl RecipientSettings {
    pub fn manager_email(&self, store_id: StoreId) -> String {
        format!("manager@store{}.{}", store_id, self.email_domain)
    }
}

fn store_of<E>(envelope: &EventEnvelope<E>) -> DomainResult<StoreId> {
    envelope.store_id().ok_or_else(|| {
        DomainError::validation(format!(
            "event {} ({}) carries no storeId",
            envelope.event_id(),
            envelope.event_type()
        ))
    })
}

pub fn low_stock_notification(
    envelope: &EventEnvelope<LowStockEvent>,
    recipients: &RecipientSettings,
    channel: Channel,
    at: DateTime<Utc>,
) -> DomainResult<Notification> {
    let store_id = store_of(envelope)?;
    let ev = envelope.payload();

    let (notification_type, priority, subject, message) = if ev.out_of_stock {
        (
            NotificationType::OutOfStockAlert,
            Priority::Urgent,
            "URGENT: Product Out of Stock",
            format!(
                "OUT OF STOCK: {} (SKU: {}) is out of stock at store {}",
                ev.product_name, ev.product_sku, store_id
            ),
        )
    } else {
        (
            NotificationType::LowStockAlert,
            Priority::High,
            "Low Stock Alert",
            format!(
                "LOW STOCK: {} (SKU: {}) has {} units remaining (threshold: {}) at store {}",
                ev.product_name, ev.product_sku, ev.current_quantity, ev.threshold, store_id
            ),
        )
    };

    Ok(Notification::pending(
        NewNotification {
            store_id,
            recipient: recipients.recipient.clone(),
            recipient_email: Some(recipients.manager_email(store_id)),
            recipient_phone: None,
            notification_type,
            channel,
            subject: subject.to_string(),
            message,
            priority,
            source_event_id: Some(envelope.event_id()),
            reference_id: Some(ev.product_sku.clone()),
        },
        at,
    ))
}

pub fn finance_decision_notification(
    envelope: &EventEnvelope<FinanceDecisionEvent>,
    recipients: &RecipientSettings,
    channel: Channel,
    at: DateTime<Utc>,
) -> DomainResult<Notification> {
    let store_id = store_of(envelope)?;
    let ev = envelope.payload();

    let notification_type = if ev.is_approved() {
        NotificationType::FinanceApplicationApproved
    } else {
        NotificationType::FinanceApplicationDeclined
    };

    let mut message = format!(
        "Finance application {} for {} ({}) has been {}.",
        ev.application_reference, ev.customer_name, ev.customer_email, ev.status
    );
    if ev.is_approved() {
        if let (Some(term), Some(monthly)) = (ev.term_months, ev.monthly_payment) {
            let amount = ev.approved_amount.unwrap_or(ev.amount);
            let rate = ev.interest_rate.map(|r| r.normalize().to_string()).unwrap_or_default();
            message.push_str(&format!(
                " Amount: {amount} over {term} months at {monthly}/month ({rate}% APR)."
            ));
        }
    }
    message.push_str(&format!(" Reason: {}", ev.decision_reason));

    Ok(Notification::pending(
        NewNotification {
            store_id,
            recipient: recipients.recipient.clone(),
            recipient_email: Some(recipients.manager_email(store_id)),
            recipient_phone: None,
            notification_type,
            channel,
            subject: format!("Finance Application Decision: {}", ev.application_reference),
            message,
            priority: Priority::Medium,
            source_event_id: Some(envelope.event_id()),
            reference_id: Some(ev.application_reference.clone()),
        },
        at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use destore_core::{ApplicationId, Money, ProductId};
    use destore_finance::FinanceStatus;
    use rust_decimal_macros::dec;

    fn low_stock(out_of_stock: bool, store: Option<StoreId>) -> EventEnvelope<LowStockEvent> {
        EventEnvelope::new(
            store,
            Utc::now(),
            LowStockEvent {
                product_id: ProductId::new(),
                product_sku: "SKU-7".to_string(),
                product_name: "Garden Chair".to_string(),
                current_quantity: if out_of_stock { 0 } else { 3 },
                threshold: 10,
                reorder_quantity: 50,
                warehouse_id: None,
                out_of_stock,
            },
        )
    }

    fn finance(status: FinanceStatus) -> EventEnvelope<FinanceDecisionEvent> {
        let approved = status == FinanceStatus::Approved;
        EventEnvelope::new(
            Some(StoreId::new(4)),
            Utc::now(),
            FinanceDecisionEvent {
                application_id: ApplicationId::new(),
                application_reference: "FIN-ABCD1234".to_string(),
                customer_name: "Jo Bloggs".to_string(),
                customer_email: "jo@example.com".to_string(),
                amount: Money::new(dec!(500.00)),
                status,
                decision_reason: if approved {
                    "Application meets lending criteria".to_string()
                } else {
                    "Credit score below threshold".to_string()
                },
                approved_amount: approved.then(|| Money::new(dec!(500.00))),
                term_months: approved.then_some(12),
                monthly_payment: approved.then(|| Money::new(dec!(44.13))),
                interest_rate: approved.then(|| dec!(5.9)),
                external_reference: Some("ENA-00000001".to_string()),
            },
        )
    }

    #[test]
    fn low_stock_alert_is_high_priority() {
        let env = low_stock(false, Some(StoreId::new(12)));
        let n = low_stock_notification(&env, &RecipientSettings::default(), Channel::Console, Utc::now())
            .unwrap();

        assert_eq!(n.notification_type(), NotificationType::LowStockAlert);
        assert_eq!(n.priority(), Priority::High);
        assert_eq!(n.subject(), "Low Stock Alert");
        assert_eq!(
            n.message(),
            "LOW STOCK: Garden Chair (SKU: SKU-7) has 3 units remaining (threshold: 10) at store 12"
        );
        assert_eq!(n.recipient(), "Store Manager");
        assert_eq!(n.recipient_email(), Some("manager@store12.destore.com"));
        assert_eq!(n.source_event_id(), Some(env.event_id()));
    }

    #[test]
    fn out_of_stock_alert_is_urgent() {
        let env = low_stock(true, Some(StoreId::new(3)));
        let n = low_stock_notification(&env, &RecipientSettings::default(), Channel::Email, Utc::now())
            .unwrap();

        assert_eq!(n.notification_type(), NotificationType::OutOfStockAlert);
        assert_eq!(n.priority(), Priority::Urgent);
        assert_eq!(n.subject(), "URGENT: Product Out of Stock");
        assert_eq!(
            n.message(),
            "OUT OF STOCK: Garden Chair (SKU: SKU-7) is out of stock at store 3"
        );
    }

    #[test]
    fn alert_without_store_is_rejected() {
        let env = low_stock(false, None);
        assert!(
            low_stock_notification(&env, &RecipientSettings::default(), Channel::Console, Utc::now())
                .is_err()
        );
    }

    #[test]
    fn approved_finance_message_includes_terms() {
        let n = finance_decision_notification(
            &finance(FinanceStatus::Approved),
            &RecipientSettings::default(),
            Channel::Console,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(n.notification_type(), NotificationType::FinanceApplicationApproved);
        assert_eq!(n.priority(), Priority::Medium);
        assert_eq!(n.subject(), "Finance Application Decision: FIN-ABCD1234");
        assert_eq!(
            n.message(),
            "Finance application FIN-ABCD1234 for Jo Bloggs (jo@example.com) has been APPROVED. \
             Amount: £500.00 over 12 months at £44.13/month (5.9% APR). \
             Reason: Application meets lending criteria"
        );
    }

    #[test]
    fn declined_finance_message_has_reason_only() {
        let n = finance_decision_notification(
            &finance(FinanceStatus::Declined),
            &RecipientSettings::default(),
            Channel::Console,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(n.notification_type(), NotificationType::FinanceApplicationDeclined);
        assert_eq!(
            n.message(),
            "Finance application FIN-ABCD1234 for Jo Bloggs (jo@example.com) has been DECLINED. \
             Reason: Credit score below threshold"
        );
    }
}
