//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// How the process logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityOptions {
    /// `EnvFilter` directive. `None` reads `RUST_LOG`, falling back to `info`.
    pub filter: Option<String>,
    /// JSON lines when true, human-readable otherwise.
    pub json: bool,
}

impl Default for ObservabilityOptions {
    fn default() -> Self {
        Self {
            filter: None,
            json: true,
        }
    }
}

impl ObservabilityOptions {
    fn env_filter(&self) -> EnvFilter {
        match &self.filter {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        }
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(options: &ObservabilityOptions) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(options.env_filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_thread_names(true)
        .with_target(false);

    let _ = if options.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
