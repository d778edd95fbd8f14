//! `destore-events`: the event contract shared by every service.
//!
//! - [`Event`]: a typed fact with a stable event type and routing key
//! - [`EventEnvelope`]: the wire shape (common header + flattened payload)
//! - [`EventBus`]: topic exchange mechanics (publish by routing key, durable
//!   queues bound to routing patterns)
//! - [`topics`]: the exchange name, routing keys and queue names

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod routing;
pub mod topics;

pub use bus::{Delivery, EventBus, QueueBinding, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{BusError, InMemoryTopicExchange};
pub use routing::topic_matches;
