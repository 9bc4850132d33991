pub mod config;
pub mod director;
pub mod error;
pub mod liveness;
pub mod pending;
pub mod placement;
pub mod registry;
pub mod router;
pub mod selection;
pub mod state;
pub mod sync;
pub mod transport;

pub use config::DirectorConfig;
pub use director::Director;
pub use error::{DirectorError, Result};

#[derive(clap::Parser, Debug)]
#[command(name = "faas-director", about = "FaaS cluster Director")]
pub struct DirectorArgs {
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
