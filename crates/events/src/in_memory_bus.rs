//! In-memory topic exchange for tests/dev and the single-process runtime.

use std::sync::{Mutex, mpsc};

use thiserror::Error;
use tracing::debug;

use crate::bus::{Delivery, EventBus, QueueBinding, Subscription};
use crate::routing::topic_matches;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Internal lock poisoned by a panicking thread.
    #[error("exchange lock poisoned")]
    Poisoned,

    #[error("queue '{0}' is already declared")]
    QueueAlreadyDeclared(String),
}

struct BoundQueue<M> {
    name: String,
    patterns: Vec<String>,
    sender: mpsc::Sender<Delivery<M>>,
}

impl<M> BoundQueue<M> {
    fn accepts(&self, routing_key: &str) -> bool {
        self.patterns.iter().any(|p| topic_matches(p, routing_key))
    }
}

/// In-memory topic exchange.
///
/// - No IO / no async
/// - Each queue receives a message at most once per publish, however many of
///   its patterns match
/// - Queues whose consumer has gone away are dropped on the next publish
pub struct InMemoryTopicExchange<M> {
    name: String,
    queues: Mutex<Vec<BoundQueue<M>>>,
}

impl<M> InMemoryTopicExchange<M> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queues: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the currently declared queues.
    pub fn queue_names(&self) -> Vec<String> {
        match self.queues.lock() {
            Ok(queues) => queues.iter().map(|q| q.name.clone()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl<M> core::fmt::Debug for InMemoryTopicExchange<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryTopicExchange")
            .field("name", &self.name)
            .field("queues", &self.queue_names())
            .finish()
    }
}

impl<M> EventBus<M> for InMemoryTopicExchange<M>
where
    M: Clone + Send + 'static,
{
    type Error = BusError;

    fn publish(&self, routing_key: &str, message: M) -> Result<(), Self::Error> {
        let mut queues = self.queues.lock().map_err(|_| BusError::Poisoned)?;

        let mut routed = 0usize;
        queues.retain(|queue| {
            if !queue.accepts(routing_key) {
                return true;
            }
            match queue.sender.send(Delivery::new(routing_key, message.clone())) {
                Ok(()) => {
                    routed += 1;
                    true
                }
                Err(_) => {
                    debug!(queue = %queue.name, "dropping queue with no consumer");
                    false
                }
            }
        });

        if routed == 0 {
            debug!(exchange = %self.name, routing_key, "message matched no queue");
        }

        Ok(())
    }

    fn declare_queue(&self, binding: QueueBinding) -> Result<Subscription<Delivery<M>>, Self::Error> {
        let mut queues = self.queues.lock().map_err(|_| BusError::Poisoned)?;

        if queues.iter().any(|q| q.name == binding.queue()) {
            return Err(BusError::QueueAlreadyDeclared(binding.queue().to_string()));
        }

        let (tx, rx) = mpsc::channel();
        queues.push(BoundQueue {
            name: binding.queue().to_string(),
            patterns: binding.patterns().to_vec(),
            sender: tx,
        });

        Ok(Subscription::new(rx))
    }
}
