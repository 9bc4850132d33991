//! FaaS Director binary.
//!
//! Usage:
//!     faas-director --config director.toml

use clap::Parser;
use faas_director::{Director, DirectorArgs, DirectorConfig};
use faas_logging::LogConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = DirectorArgs::parse();

    faas_logging::init_logging(LogConfig {
        app_name: "faas-director",
        verbose: args.verbose,
    })?;

    let mut config = match &args.config {
        Some(path) => DirectorConfig::load(path)?,
        None => DirectorConfig::default(),
    };
    if let Some(ip) = args.director_ip_addr {
        config.network.director_ip_addr = ip;
    }
    if let Some(port) = args.director_port {
        config.network.director_port = port;
    }

    let director = Director::new(config);
    info!("starting faas-director");

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        let _ = stop_tx.send(true);
    });

    if let Err(e) = director.run(stop_rx).await {
        tracing::error!("director exited with error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
