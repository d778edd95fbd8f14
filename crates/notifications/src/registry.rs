use std::collections::HashMap;
use std::sync::Arc;

use destore_core::{DomainError, DomainResult};

use crate::notification::Channel;
use crate::sender::NotificationSender;

/// Channel → sender mapping, resolved once at startup.
///
/// Construction fails when two senders claim the same channel; resolving a
/// channel no sender supports is a configuration error, not a retryable
/// failure.
#[derive(Clone)]
pub struct SenderRegistry {
    senders: HashMap<Channel, Arc<dyn NotificationSender>>,
}

impl SenderRegistry {
    pub fn new(senders: Vec<Arc<dyn NotificationSender>>) -> DomainResult<Self> {
        let mut by_channel: HashMap<Channel, Arc<dyn NotificationSender>> = HashMap::new();

        for channel in Channel::ALL {
            let mut supporting = senders.iter().filter(|s| s.supports(channel));
            let Some(first) = supporting.next() else {
                continue;
            };
            if let Some(second) = supporting.next() {
                return Err(DomainError::illegal_state(format!(
                    "multiple senders for channel {channel}: {} and {}",
                    first.name(),
                    second.name()
                )));
            }
            by_channel.insert(channel, Arc::clone(first));
        }

        Ok(Self { senders: by_channel })
    }

    /// Console, email and SMS senders.
    pub fn with_builtin_senders() -> DomainResult<Self> {
        Self::new(vec![
            Arc::new(crate::sender::ConsoleSender),
            Arc::new(crate::sender::EmailSender),
            Arc::new(crate::sender::SmsSender),
        ])
    }

    pub fn resolve(&self, channel: Channel) -> DomainResult<&dyn NotificationSender> {
        self.senders
            .get(&channel)
            .map(|s| s.as_ref())
            .ok_or_else(|| DomainError::illegal_state(format!("No sender found for channel: {channel}")))
    }

    /// Fail fast if any of `channels` has no sender.
    pub fn ensure_covers(&self, channels: &[Channel]) -> DomainResult<()> {
        for channel in channels {
            self.resolve(*channel)?;
        }
        Ok(())
    }

    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self.senders.keys().copied().collect();
        channels.sort();
        channels
    }
}

impl core::fmt::Debug for SenderRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SenderRegistry")
            .field("channels", &self.channels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::Notification;
    use crate::sender::{ConsoleSender, EmailSender};

    struct Everything;

    impl NotificationSender for Everything {
        fn name(&self) -> &'static str {
            "everything"
        }

        fn supports(&self, _channel: Channel) -> bool {
            true
        }

        fn send(&self, _n: &Notification) -> bool {
            true
        }
    }

    #[test]
    fn resolves_one_sender_per_channel() {
        let reg = SenderRegistry::with_builtin_senders().unwrap();
        assert_eq!(reg.resolve(Channel::Console).unwrap().name(), "console");
        assert_eq!(reg.resolve(Channel::Email).unwrap().name(), "email");
        assert_eq!(reg.resolve(Channel::Sms).unwrap().name(), "sms");
    }

    #[test]
    fn duplicate_handlers_are_rejected() {
        let err = SenderRegistry::new(vec![Arc::new(ConsoleSender), Arc::new(Everything)]).unwrap_err();
        match err {
            DomainError::IllegalState(msg) => assert!(msg.contains("multiple senders")),
            other => panic!("Expected IllegalState error, got {other:?}"),
        }
    }

    #[test]
    fn missing_channel_is_a_configuration_error() {
        let reg = SenderRegistry::new(vec![Arc::new(EmailSender)]).unwrap();
        assert!(matches!(reg.resolve(Channel::Console), Err(DomainError::IllegalState(_))));
        assert!(reg.ensure_covers(&[Channel::Email]).is_ok());
        assert!(reg.ensure_covers(&[Channel::Email, Channel::Sms]).is_err());
    }
}
