//! Delivery capability per channel.
//!
//! Transports are outside this system; the built-in senders log the outgoing
//! message through `tracing` and report success or failure.

use tracing::{info, warn};

use crate::notification::{Channel, Notification};

/// A delivery capability for one or more channels.
pub trait NotificationSender: Send + Sync {
    /// Stable name used in logs and configuration errors.
    fn name(&self) -> &'static str;

    fn supports(&self, channel: Channel) -> bool;

    /// Attempt delivery. `false` marks the notification FAILED; there is no
    /// automatic retry.
    fn send(&self, notification: &Notification) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSender;

impl NotificationSender for ConsoleSender {
    fn name(&self) -> &'static str {
        "console"
    }

    fn supports(&self, channel: Channel) -> bool {
        channel == Channel::Console
    }

    fn send(&self, n: &Notification) -> bool {
        info!(
            store_id = %n.store_id(),
            recipient = n.recipient(),
            priority = ?n.priority(),
            subject = n.subject(),
            "{}",
            n.message()
        );
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EmailSender;

impl NotificationSender for EmailSender {
    fn name(&self) -> &'static str {
        "email"
    }

    fn supports(&self, channel: Channel) -> bool {
        channel == Channel::Email
    }

    fn send(&self, n: &Notification) -> bool {
        let Some(to) = n.recipient_email() else {
            warn!(notification_id = %destore_core::Entity::id(n), "no recipient email address");
            return false;
        };
        info!(to, subject = n.subject(), "email sent");
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SmsSender;

impl NotificationSender for SmsSender {
    fn name(&self) -> &'static str {
        "sms"
    }

    fn supports(&self, channel: Channel) -> bool {
        channel == Channel::Sms
    }

    fn send(&self, n: &Notification) -> bool {
        let Some(to) = n.recipient_phone() else {
            warn!(notification_id = %destore_core::Entity::id(n), "no recipient phone number");
            return false;
        };
        info!(to, "sms sent");
        true
    }
}
