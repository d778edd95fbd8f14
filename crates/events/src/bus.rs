//! Topic exchange abstraction (mechanics only).
//!
//! Producers publish a message under a routing key; they never name a
//! consumer. Consumers declare a named, durable queue bound to one or more
//! routing patterns and receive every message whose key matches.
//!
//! Delivery is **at-least-once**: the same message may arrive more than once,
//! so consumers must be idempotent. Ordering is only preserved per queue for a
//! single publisher.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::EventEnvelope;

/// A consumer's handle on a declared queue.
///
/// Messages published before the consumer starts reading are buffered in the
/// queue. A subscription is meant to be drained by one thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// A message as delivered to a queue, with the key it was published under.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<M> {
    routing_key: String,
    message: M,
}

impl<M> Delivery<M> {
    pub fn new(routing_key: impl Into<String>, message: M) -> Self {
        Self {
            routing_key: routing_key.into(),
            message,
        }
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn message(&self) -> &M {
        &self.message
    }

    pub fn into_message(self) -> M {
        self.message
    }
}

impl Delivery<JsonValue> {
    /// Decode the JSON body into a typed envelope.
    pub fn decode<E: DeserializeOwned>(&self) -> Result<EventEnvelope<E>, serde_json::Error> {
        serde_json::from_value(self.message.clone())
    }
}

/// A named queue and the routing patterns it is bound to.
///
/// Patterns use topic-exchange wildcards: `*` matches exactly one
/// dot-separated word, `#` matches zero or more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    queue: String,
    patterns: Vec<String>,
}

impl QueueBinding {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            patterns: Vec::new(),
        }
    }

    pub fn bind(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Topic exchange: publish by routing key, consume from bound queues.
///
/// Implementations must be safe to share across threads; services publish
/// concurrently from request threads and periodic sweeps.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    /// Route `message` to every queue with a pattern matching `routing_key`.
    ///
    /// A message matching no queue is dropped.
    fn publish(&self, routing_key: &str, message: M) -> Result<(), Self::Error>;

    /// Declare a durable queue and attach a consumer to it.
    fn declare_queue(&self, binding: QueueBinding) -> Result<Subscription<Delivery<M>>, Self::Error>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, routing_key: &str, message: M) -> Result<(), Self::Error> {
        (**self).publish(routing_key, message)
    }

    fn declare_queue(&self, binding: QueueBinding) -> Result<Subscription<Delivery<M>>, Self::Error> {
        (**self).declare_queue(binding)
    }
}
