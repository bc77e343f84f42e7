use std::net::SocketAddr;
use std::path::PathBuf;

use crate::state::{ChannelConfig, RateLimitConfig};

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// address for the API server to listen on
    pub listen_addr: SocketAddr,

    /// per-address request budget on `/api`
    pub rate_limit: RateLimitConfig,

    /// idle expiry and receiver cap for live channels
    pub channel: ChannelConfig,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            rate_limit: RateLimitConfig::default(),
            channel: ChannelConfig::default(),
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}
