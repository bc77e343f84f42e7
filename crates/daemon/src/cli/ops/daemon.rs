use std::net::SocketAddr;

use clap::Args;

use sepa_daemon::state::AppState;
use sepa_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override API server port (default from config)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] sepa_daemon::state::StateError),

    #[error("daemon failed: {0}")]
    Failed(#[from] sepa_daemon::process::ServiceError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        // Config file is optional for the daemon; defaults apply without one
        let app_config = AppState::load_or_default(ctx.config_path.clone())?;

        let api_port = self.api_port.unwrap_or(app_config.api_port);

        let config = ServiceConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], api_port)),
            rate_limit: app_config.rate_limit,
            channel: app_config.channel,
            log_level: app_config.tracing_level(),
            log_dir: self.log_dir.clone(),
        };

        spawn_service(&config).await?;
        Ok("daemon ended".to_string())
    }
}
