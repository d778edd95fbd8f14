use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use destore_core::{DomainError, DomainResult, Entity, StoreId};
use destore_events::topics::{
    FINANCE_DECISION, INVENTORY_LOW_STOCK, INVENTORY_OUT_OF_STOCK, NOTIFICATION_FINANCE_QUEUE,
    NOTIFICATION_LOW_STOCK_QUEUE,
};
use destore_events::{Delivery, EventEnvelope, QueueBinding};
use destore_finance::FinanceDecisionEvent;
use destore_inventory::LowStockEvent;
use destore_notifications::{
    Notification, NotificationStatus, RecipientSettings, SenderRegistry, finance_decision_notification,
    low_stock_notification,
};

use crate::config::NotificationConfig;
use crate::store::EntityStore;

/// Queues the dispatcher consumes, with their bindings.
pub fn notification_bindings() -> Vec<QueueBinding> {
    vec![
        QueueBinding::new(NOTIFICATION_LOW_STOCK_QUEUE)
            .bind(INVENTORY_LOW_STOCK)
            .bind(INVENTORY_OUT_OF_STOCK),
        QueueBinding::new(NOTIFICATION_FINANCE_QUEUE).bind(FINANCE_DECISION),
    ]
}

/// Turns low-stock and finance-decision events into notifications.
///
/// Each notification is persisted PENDING before its sender is called.
/// Deliveries are idempotent on the source event id: a redelivered event is
/// acknowledged without a second notification.
pub struct NotificationDispatcher {
    notifications: Arc<dyn EntityStore<Notification>>,
    senders: SenderRegistry,
    config: NotificationConfig,
    recipients: RecipientSettings,
    /// Source event ids already recorded, loaded from the store on first use.
    seen: Mutex<Option<HashSet<Uuid>>>,
}

impl NotificationDispatcher {
    pub fn new(
        notifications: Arc<dyn EntityStore<Notification>>,
        senders: SenderRegistry,
        config: NotificationConfig,
    ) -> Self {
        let recipients = config.recipients();
        Self {
            notifications,
            senders,
            config,
            recipients,
            seen: Mutex::new(None),
        }
    }

    /// Handle one queue delivery. `Ok(None)` means the event was already
    /// handled.
    pub fn handle_delivery(&self, delivery: &Delivery<JsonValue>) -> DomainResult<Option<Notification>> {
        match delivery.routing_key() {
            INVENTORY_LOW_STOCK | INVENTORY_OUT_OF_STOCK => self.handle_low_stock(&decode(delivery)?),
            FINANCE_DECISION => self.handle_finance_decision(&decode(delivery)?),
            other => Err(DomainError::validation(format!(
                "no notification handler for routing key '{other}'"
            ))),
        }
    }

    pub fn handle_low_stock(&self, envelope: &EventEnvelope<LowStockEvent>) -> DomainResult<Option<Notification>> {
        let pending = low_stock_notification(
            envelope,
            &self.recipients,
            self.config.low_stock_channel,
            Utc::now(),
        )?;
        self.dispatch(pending)
    }

    pub fn handle_finance_decision(
        &self,
        envelope: &EventEnvelope<FinanceDecisionEvent>,
    ) -> DomainResult<Option<Notification>> {
        let pending = finance_decision_notification(
            envelope,
            &self.recipients,
            self.config.finance_channel,
            Utc::now(),
        )?;
        self.dispatch(pending)
    }

    /// Newest first.
    pub fn notifications_for_store(&self, store_id: StoreId) -> DomainResult<Vec<Notification>> {
        let mut found = self
            .notifications
            .filter(&|n: &Notification| n.store_id() == store_id)?;
        found.sort_by_key(|n| std::cmp::Reverse(n.created_at()));
        Ok(found)
    }

    /// Notifications for `store_id` created within the last `hours`.
    pub fn recent_notifications(&self, store_id: StoreId, hours: u32) -> DomainResult<Vec<Notification>> {
        let since = Utc::now() - Duration::hours(i64::from(hours));
        Ok(self
            .notifications_for_store(store_id)?
            .into_iter()
            .filter(|n| n.created_at() >= since)
            .collect())
    }

    pub fn failed_notifications(&self) -> DomainResult<Vec<Notification>> {
        let mut failed = self
            .notifications
            .filter(&|n: &Notification| n.status() == NotificationStatus::Failed)?;
        failed.sort_by_key(|n| n.created_at());
        Ok(failed)
    }

    fn dispatch(&self, pending: Notification) -> DomainResult<Option<Notification>> {
        {
            // Guards the duplicate check and insert as one step.
            let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
            if seen.is_none() {
                *seen = Some(self.recorded_sources()?);
            }
            let source = pending.source_event_id();
            if let Some(source) = source {
                if seen.as_ref().is_some_and(|index| index.contains(&source)) {
                    debug!(source_event_id = %source, "event already notified; skipping");
                    return Ok(None);
                }
            }
            self.notifications.insert(pending.clone())?;
            if let (Some(index), Some(source)) = (seen.as_mut(), source) {
                index.insert(source);
            }
        }

        let sender = self.senders.resolve(pending.channel()).inspect_err(|err| {
            error!(
                notification_id = %pending.id(),
                channel = %pending.channel(),
                error = %err,
                "notification left pending"
            );
        })?;

        let delivered = if sender.send(&pending) {
            let sent = pending.mark_sent(Utc::now())?;
            info!(
                notification_id = %sent.id(),
                store_id = %sent.store_id(),
                channel = %sent.channel(),
                "notification sent"
            );
            sent
        } else {
            let failed = pending.mark_failed(format!("{} sender reported failure", sender.name()))?;
            warn!(
                notification_id = %failed.id(),
                store_id = %failed.store_id(),
                channel = %failed.channel(),
                "notification failed"
            );
            failed
        };

        self.notifications.save(delivered.clone())?;
        Ok(Some(delivered))
    }

    fn recorded_sources(&self) -> DomainResult<HashSet<Uuid>> {
        let recorded = self.notifications.list()?;
        Ok(recorded.iter().filter_map(Notification::source_event_id).collect())
    }
}

fn decode<E: DeserializeOwned>(delivery: &Delivery<JsonValue>) -> DomainResult<EventEnvelope<E>> {
    delivery.decode().map_err(|e| {
        DomainError::validation(format!(
            "malformed '{}' event: {e}",
            delivery.routing_key()
        ))
    })
}

impl core::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("senders", &self.senders)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
