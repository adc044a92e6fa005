use blockpost_core::infrastructure::config::{CONFIG_PATH_ENV, DATA_DIR_ENV, PROFILE_ENV};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blockpost-operator")]
#[command(about = "Blockpost AVS operator node", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override data directory
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Override ledger JSON-RPC URL
    #[arg(short, long)]
    pub rpc_url: Option<String>,

    /// Apply `[profiles.<name>]` overrides from the config file
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Log filters, e.g. `info` or `info,blockpost_core::application=debug`
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Also write rolling log files to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Run the registration handshake and exit
    #[arg(long, conflicts_with = "skip_registration")]
    pub register_only: bool,

    /// Do not attempt registration on startup
    #[arg(long)]
    pub skip_registration: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Flags are layered as environment overrides so the config loader sees one source of truth.
    pub fn apply_to_env(&self) {
        if let Some(config_path) = &self.config {
            std::env::set_var(CONFIG_PATH_ENV, config_path);
        }

        if let Some(data_dir) = &self.data_dir {
            std::env::set_var(DATA_DIR_ENV, data_dir);
        }

        if let Some(profile) = &self.profile {
            std::env::set_var(PROFILE_ENV, profile);
        }

        if let Some(rpc_url) = &self.rpc_url {
            std::env::set_var("BLOCKPOST_LEDGER__RPC_URL", rpc_url);
        }

        if let Some(log_level) = &self.log_level {
            std::env::set_var("BLOCKPOST_LOGGING__FILTERS", log_level);
        }

        if let Some(log_dir) = &self.log_dir {
            std::env::set_var("BLOCKPOST_LOGGING__LOG_DIR", log_dir);
        }

        if self.skip_registration {
            std::env::set_var("BLOCKPOST_REGISTRATION__SKIP", "true");
        }
    }
}
