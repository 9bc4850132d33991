//! Unified launcher for the FaaS cluster, grounded on the teacher's
//! `casparian::main` (`Cli { command: Commands }` dispatching to
//! `Sentinel`/`Worker`), scaled down to this workspace's two processes
//! and ported to a single Tokio runtime shared by both tasks in `start`.
//!
//! Usage:
//!     faas director [--config director.toml]
//!     faas worker [--config worker.toml]
//!     faas start   # Director + one Worker in this process, for local trials

use clap::{Parser, Subcommand};
use faas_director::{Director, DirectorArgs, DirectorConfig};
use faas_logging::LogConfig;
use faas_worker::{Worker, WorkerArgs, WorkerConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "faas", about = "FaaS cluster: Director and Worker launcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the Director only.
    Director {
        #[command(flatten)]
        args: DirectorArgs,
    },
    /// Run a Worker only.
    Worker {
        #[command(flatten)]
        args: WorkerArgs,
    },
    /// Run a Director and one Worker in this process, for local trials.
    Start {
        /// Path to a Director TOML config file.
        #[arg(long)]
        director_config: Option<std::path::PathBuf>,
        /// Path to a Worker TOML config file.
        #[arg(long)]
        worker_config: Option<std::path::PathBuf>,
        /// Enable verbose (debug) logging regardless of RUST_LOG.
        #[arg(long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Director { args } => run_director(args).await,
        Commands::Worker { args } => run_worker(args).await,
        Commands::Start {
            director_config,
            worker_config,
            verbose,
        } => run_start(director_config, worker_config, verbose).await,
    }
}

async fn run_director(args: DirectorArgs) -> anyhow::Result<()> {
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
        error!("director exited with error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run_worker(args: WorkerArgs) -> anyhow::Result<()> {
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
        error!("worker exited with error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

/// Runs a Director and a single Worker side by side on this process's
/// runtime, sharing one shutdown signal. Useful for local trials; a
/// real deployment runs `director`/`worker` as separate processes so
/// either can be restarted or scaled independently.
async fn run_start(
    director_config_path: Option<std::path::PathBuf>,
    worker_config_path: Option<std::path::PathBuf>,
    verbose: bool,
) -> anyhow::Result<()> {
    faas_logging::init_logging(LogConfig {
        app_name: "faas",
        verbose,
    })?;

    let director_config = match &director_config_path {
        Some(path) => DirectorConfig::load(path)?,
        None => DirectorConfig::default(),
    };
    let worker_config = match &worker_config_path {
        Some(path) => WorkerConfig::load(path)?,
        None => WorkerConfig::default(),
    };

    let director = Director::new(director_config);
    let worker = Worker::new(worker_config);
    info!(worker_id = %worker.id(), "starting faas director + worker in one process");

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn({
        let stop_tx = stop_tx.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            let _ = stop_tx.send(true);
        }
    });

    let director_rx = stop_rx.clone();
    let director_handle = tokio::spawn(async move { director.run(director_rx).await });
    let worker_handle = tokio::spawn(async move { worker.run(stop_rx).await });

    let (director_result, worker_result) = tokio::join!(director_handle, worker_handle);
    director_result??;
    worker_result??;
    Ok(())
}
