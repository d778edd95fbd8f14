use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use destore_events::{Delivery, EventBus, QueueBinding, Subscription};

use super::{WorkerError, WorkerHandle};

const TICK: Duration = Duration::from_millis(250);

/// Queue consumer loop.
///
/// - Declares its queue on the exchange before the thread starts, so nothing
///   published after `spawn` returns is missed
/// - Applies a handler to each delivery; handler errors are logged and the
///   delivery is dropped
/// - Supports graceful shutdown
#[derive(Debug)]
pub struct SubscriptionWorker;

impl SubscriptionWorker {
    /// `handler` must be idempotent (at-least-once delivery).
    pub fn spawn<M, B, H, E>(
        name: &'static str,
        bus: &B,
        binding: QueueBinding,
        mut handler: H,
    ) -> Result<WorkerHandle, WorkerError>
    where
        M: Send + 'static,
        B: EventBus<M> + ?Sized,
        H: FnMut(Delivery<M>) -> Result<(), E> + Send + 'static,
        E: core::fmt::Display,
    {
        let queue = binding.queue().to_string();
        let sub = bus
            .declare_queue(binding)
            .map_err(|e| WorkerError::Bus(e.to_string()))?;
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &mut handler))?;

        info!(worker = name, queue = %queue, "subscription worker started");
        Ok(WorkerHandle::new(name, shutdown_tx, join))
    }
}

fn worker_loop<M, H, E>(
    name: &'static str,
    sub: Subscription<Delivery<M>>,
    shutdown_rx: mpsc::Receiver<()>,
    handler: &mut H,
) where
    H: FnMut(Delivery<M>) -> Result<(), E>,
    E: core::fmt::Display,
{
    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(TICK) {
            Ok(delivery) => {
                let routing_key = delivery.routing_key().to_string();
                if let Err(err) = handler(delivery) {
                    warn!(worker = name, routing_key = %routing_key, error = %err, "delivery handler failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!(worker = name, "subscription worker stopped");
}
