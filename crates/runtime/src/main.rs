use anyhow::Context;

use destore_infra::DestoreConfig;
use destore_observability::ObservabilityOptions;
use destore_runtime::Runtime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DestoreConfig::from_env().context("reading DESTORE_* configuration")?;

    destore_observability::init(&ObservabilityOptions {
        filter: config.observability.log_filter.clone(),
        json: config.observability.json,
    });

    let runtime = Runtime::start(config).context("starting runtime")?;
    tracing::info!(workers = ?runtime.worker_names(), "destore running; Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    tracing::info!("shutdown requested");

    // Worker joins block on threads.
    tokio::task::spawn_blocking(move || runtime.shutdown())
        .await
        .context("joining workers")?;
    Ok(())
}
