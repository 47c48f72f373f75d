// CLI module for pace-pro-sw

use crate::config::AppConfig;
use clap::Parser;

/// pace-pro-sw - offline caching worker for the PACE PRO web app
#[derive(Parser, Debug, Default)]
#[command(name = "pace-pro-sw", version, about, long_about = None)]
pub struct Args {
    /// Configuration file (TOML). Defaults to ~/.pace-pro/config.toml when present.
    #[arg(long, short = 'c', env = "PACE_PRO_CONFIG")]
    pub config: Option<String>,

    /// Origin of the hosted app, e.g. http://127.0.0.1:3000
    #[arg(long)]
    pub origin: Option<String>,

    /// Port for the local proxy
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Keep cache buckets in memory instead of on disk
    #[arg(long)]
    pub in_memory: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Apply command-line overrides, the highest-precedence configuration source.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(origin) = &self.origin {
            config.worker.app_origin = origin.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.in_memory {
            config.cache.backend = crate::config::CacheBackendKind::Memory;
        }
    }
}
