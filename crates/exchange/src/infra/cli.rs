use std::{net::SocketAddr, path::PathBuf};

#[derive(Debug, clap::Parser)]
pub struct Args {
    /// The address to bind the exchange to.
    #[clap(long, env, default_value = "0.0.0.0:8000")]
    pub addr: SocketAddr,

    /// The log filter.
    #[clap(long, env, default_value = "warn,exchange=debug,observe=info")]
    pub log: String,

    /// At which log level logs should be printed to stderr instead of stdout.
    #[clap(long, env)]
    pub stderr_threshold: Option<tracing::Level>,

    /// Whether to use JSON format for the logs.
    #[clap(long, env, default_value = "false")]
    pub use_json_logs: bool,

    /// Path to the exchange configuration file. This file should be in TOML
    /// format. For an example see `crates/exchange/example.toml`.
    #[clap(long, env)]
    pub config: PathBuf,
}
