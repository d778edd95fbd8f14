//! Store-manager notifications: the notification record, rendering of alerts
//! from workflow events, and the per-channel sender capability.

pub mod messages;
pub mod notification;
pub mod registry;
pub mod sender;

pub use messages::{RecipientSettings, finance_decision_notification, low_stock_notification};
pub use notification::{Channel, NewNotification, Notification, NotificationStatus, NotificationType, Priority};
pub use registry::SenderRegistry;
pub use sender::{ConsoleSender, EmailSender, NotificationSender, SmsSender};
