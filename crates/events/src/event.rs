use serde::Serialize;

/// A fact published by one service for others to react to.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **self-routing** (the producer never names a consumer, only a routing key)
pub trait Event: Clone + core::fmt::Debug + Serialize + Send + Sync + 'static {
    /// Stable event name carried in the envelope (e.g. "inventory.low-stock").
    fn event_type(&self) -> &'static str;

    /// Routing key on the exchange. Defaults to the event type.
    fn routing_key(&self) -> &'static str {
        self.event_type()
    }

    /// Name of the originating service.
    fn source(&self) -> &'static str;
}
