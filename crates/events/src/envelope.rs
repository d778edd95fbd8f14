use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use destore_core::StoreId;

use crate::Event;

/// Envelope for a published event: common header + type-specific payload.
///
/// On the wire the payload fields sit next to the header fields:
///
/// ```json
/// { "eventId": "...", "eventType": "inventory.low-stock", "occurredAt": "...",
///   "source": "inventory-service", "storeId": 12, "productSku": "SKU-1", ... }
/// ```
///
/// Envelopes are immutable once built; consumers deduplicate on `event_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    event_type: String,
    occurred_at: DateTime<Utc>,
    source: String,
    store_id: Option<StoreId>,

    #[serde(flatten)]
    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap an event, generating a fresh event id.
    pub fn new(store_id: Option<StoreId>, occurred_at: DateTime<Utc>, payload: E) -> Self {
        Self::with_event_id(Uuid::now_v7(), store_id, occurred_at, payload)
    }

    pub fn with_event_id(
        event_id: Uuid,
        store_id: Option<StoreId>,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            event_type: payload.event_type().to_string(),
            occurred_at,
            source: payload.source().to_string(),
            store_id,
            payload,
        }
    }

    pub fn routing_key(&self) -> &'static str {
        self.payload.routing_key()
    }
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn store_id(&self) -> Option<StoreId> {
        self.store_id
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
