use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::{WorkerError, WorkerHandle};

/// Runs a task at a fixed interval until shut down.
///
/// The first run happens one interval after spawn. A failing run is logged
/// and the schedule continues.
#[derive(Debug)]
pub struct PeriodicWorker;

impl PeriodicWorker {
    pub fn spawn<T, E>(name: &'static str, interval: Duration, mut task: T) -> Result<WorkerHandle, WorkerError>
    where
        T: FnMut() -> Result<(), E> + Send + 'static,
        E: core::fmt::Display,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new().name(name.to_string()).spawn(move || {
            loop {
                match shutdown_rx.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(err) = task() {
                            warn!(worker = name, error = %err, "periodic task failed");
                        }
                    }
                }
            }
            info!(worker = name, "periodic worker stopped");
        })?;

        info!(worker = name, interval_ms = interval.as_millis() as u64, "periodic worker started");
        Ok(WorkerHandle::new(name, shutdown_tx, join))
    }
}
