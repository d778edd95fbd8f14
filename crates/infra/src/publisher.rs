//! Fire-and-forget event publishing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, error};
use uuid::Uuid;

use destore_core::StoreId;
use destore_events::{BusError, Event, EventBus, EventEnvelope};

/// The exchange as seen by services: JSON envelopes routed by key.
pub type SharedBus = Arc<dyn EventBus<JsonValue, Error = BusError>>;

/// Wraps events in envelopes and publishes them under their routing key.
///
/// A failed publish is logged and swallowed: the business state that caused
/// the event is already committed and the operation must not fail because of
/// the bus.
#[derive(Clone)]
pub struct EventPublisher {
    bus: SharedBus,
}

impl EventPublisher {
    pub fn new(bus: SharedBus) -> Self {
        Self { bus }
    }

    /// Publish `event`; returns the envelope's event id when the exchange
    /// accepted it.
    pub fn publish<E: Event>(
        &self,
        store_id: Option<StoreId>,
        event: E,
        occurred_at: DateTime<Utc>,
    ) -> Option<Uuid> {
        let envelope = EventEnvelope::new(store_id, occurred_at, event);
        let routing_key = envelope.routing_key();
        let event_id = envelope.event_id();

        let body = match serde_json::to_value(&envelope) {
            Ok(body) => body,
            Err(err) => {
                error!(%event_id, routing_key, error = %err, "failed to serialize event");
                return None;
            }
        };

        match self.bus.publish(routing_key, body) {
            Ok(()) => {
                debug!(%event_id, routing_key, "event published");
                Some(event_id)
            }
            Err(err) => {
                error!(%event_id, routing_key, error = %err, "failed to publish event");
                None
            }
        }
    }
}

impl core::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventPublisher").finish_non_exhaustive()
    }
}
