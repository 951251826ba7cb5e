use std::sync::Arc;

use tracing::info;

use slotkeep::completer::run_completer;
use slotkeep::config::Config;
use slotkeep::engine::BookingEngine;
use slotkeep::notify::NotifyHub;
use slotkeep::store::InMemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    slotkeep::observability::init_tracing(config.log_json);
    slotkeep::observability::init_metrics(config.metrics_port)?;

    let store = Arc::new(InMemoryStore::new());
    let hub = Arc::new(NotifyHub::new(config.notify_channel_capacity));
    let engine = Arc::new(BookingEngine::new(
        store.clone(),
        store.clone(),
        store,
        hub,
        config.engine(),
    ));

    info!("slotkeep started (in-memory store)");
    info!("  adapter_timeout: {:?}", config.adapter_timeout);
    info!("  sweep_interval: {:?}", config.sweep_interval);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let completer = tokio::spawn(run_completer(engine, config.sweep_interval));

    // Run until SIGTERM/ctrl-c
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await?;
    }

    info!("shutdown signal received");
    completer.abort();
    info!("slotkeep stopped");
    Ok(())
}
