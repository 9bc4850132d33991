pub mod audit;
pub mod cache;
pub mod catalog;
pub mod chain;
pub mod config;
pub mod error;
pub mod handlers;
pub mod heartbeat;
pub mod persistence;
pub mod procedures;
pub mod stats;
pub mod state;
pub mod transport;
pub mod validator;
pub mod worker;

pub use config::WorkerConfig;
pub use error::{Result, WorkerError};
pub use worker::Worker;

#[derive(clap::Parser, Debug)]
#[command(name = "faas-worker", about = "FaaS cluster Worker")]
pub struct WorkerArgs {
    /// Path to a TOML config file. Defaults are used for any missing key.
    #[arg(long, short = 'c')]
    pub config: Option<std::path::PathBuf>,

    /// Override network.director_ip_addr.
    #[arg(long)]
    pub director_ip_addr: Option<String>,

    /// Override network.director_port.
    #[arg(long)]
    pub director_port: Option<u16>,

    /// Enable verbose (debug) logging regardless of RUST_LOG.
    #[arg(long)]
    pub verbose: bool,
}
