use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use destore_core::{DomainError, DomainResult, Entity, NotificationId, StoreId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Email,
    Sms,
    Console,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::Sms, Channel::Console];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "EMAIL",
            Channel::Sms => "SMS",
            Channel::Console => "CONSOLE",
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Channel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(Channel::Email),
            "SMS" => Ok(Channel::Sms),
            "CONSOLE" => Ok(Channel::Console),
            other => Err(DomainError::validation(format!("unknown notification channel '{other}'"))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    LowStockAlert,
    OutOfStockAlert,
    StockReplenished,
    FinanceApplicationApproved,
    FinanceApplicationDeclined,
    PriceChange,
    SystemAlert,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

/// A notification to a store manager.
///
/// Persisted as `Pending` before any delivery attempt; the attempt moves it to
/// `Sent` or `Failed` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    id: NotificationId,
    store_id: StoreId,
    recipient: String,
    recipient_email: Option<String>,
    recipient_phone: Option<String>,
    notification_type: NotificationType,
    channel: Channel,
    subject: String,
    message: String,
    priority: Priority,
    status: NotificationStatus,
    source_event_id: Option<Uuid>,
    reference_id: Option<String>,
    failure_reason: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

/// Builder input for a new notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub store_id: StoreId,
    pub recipient: String,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub notification_type: NotificationType,
    pub channel: Channel,
    pub subject: String,
    pub message: String,
    pub priority: Priority,
    pub source_event_id: Option<Uuid>,
    pub reference_id: Option<String>,
}

impl Notification {
    pub fn pending(new: NewNotification, at: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            store_id: new.store_id,
            recipient: new.recipient,
            recipient_email: new.recipient_email,
            recipient_phone: new.recipient_phone,
            notification_type: new.notification_type,
            channel: new.channel,
            subject: new.subject,
            message: new.message,
            priority: new.priority,
            status: NotificationStatus::Pending,
            source_event_id: new.source_event_id,
            reference_id: new.reference_id,
            failure_reason: None,
            version: 1,
            created_at: at,
            sent_at: None,
        }
    }

    pub fn mark_sent(&self, at: DateTime<Utc>) -> DomainResult<Self> {
        self.ensure_pending()?;
        let mut next = self.clone();
        next.status = NotificationStatus::Sent;
        next.sent_at = Some(at);
        next.version += 1;
        Ok(next)
    }

    pub fn mark_failed(&self, reason: impl Into<String>) -> DomainResult<Self> {
        self.ensure_pending()?;
        let mut next = self.clone();
        next.status = NotificationStatus::Failed;
        next.failure_reason = Some(reason.into());
        next.version += 1;
        Ok(next)
    }

    fn ensure_pending(&self) -> DomainResult<()> {
        if self.status != NotificationStatus::Pending {
            return Err(DomainError::illegal_state(format!(
                "notification {} was already delivered or failed",
                self.id
            )));
        }
        Ok(())
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn recipient_email(&self) -> Option<&str> {
        self.recipient_email.as_deref()
    }

    pub fn recipient_phone(&self) -> Option<&str> {
        self.recipient_phone.as_deref()
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> NotificationStatus {
        self.status
    }

    pub fn source_event_id(&self) -> Option<Uuid> {
        self.source_event_id
    }

    pub fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }
}

impl Entity for Notification {
    type Id = NotificationId;

    fn id(&self) -> NotificationId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
