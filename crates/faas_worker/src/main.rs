//! FaaS Worker binary.
//!
//! Usage:
//!     faas-worker --config worker.toml

use clap::Parser;
use faas_logging::LogConfig;
use faas_worker::{Worker, WorkerArgs, WorkerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = WorkerArgs::parse();

    faas_logging::init_logging(LogConfig {
        app_name: "faas-worker",
        verbose: args.verbose,
    })?;

    let mut config = match &args.config {
        Some(path) => WorkerConfig::load(path)?,
        None => WorkerConfig::default(),
    };
    if let Some(ip) = args.director_ip_addr {
        config.network.director_ip_addr = ip;
    }
    if let Some(port) = args.director_port {
        config.network.director_port = port;
    }

    let worker = Worker::new(config);
    info!(worker_id = %worker.id(), "starting faas-worker");

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        let _ = stop_tx.send(true);
    });

    if let Err(e) = worker.run(stop_rx).await {
        tracing::error!("worker exited with error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
