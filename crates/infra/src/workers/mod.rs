//! Background workers: queue consumers and fixed-interval monitors.

pub mod periodic;
pub mod subscription_worker;

use std::sync::mpsc;
use std::thread;

use thiserror::Error;

pub use periodic::PeriodicWorker;
pub use subscription_worker::SubscriptionWorker;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to declare queue: {0}")]
    Bus(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn new(name: &'static str, shutdown: mpsc::Sender<()>, join: thread::JoinHandle<()>) -> Self {
        Self {
            name,
            shutdown,
            join: Some(join),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}
