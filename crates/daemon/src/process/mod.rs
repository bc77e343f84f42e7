pub mod utils;

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const CHANNEL_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

use crate::http_server;
use crate::service_state::StateSetupError;
use crate::{ServiceConfig, ServiceState};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to set up service state: {0}")]
    State(#[from] StateSetupError),
    #[error("failed to install signal handlers: {0}")]
    Signals(#[from] std::io::Error),
    #[error("service did not shut down within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Handle for gracefully shutting down the service.
pub struct ShutdownHandle {
    graceful_waiter: tokio::task::JoinHandle<()>,
    server: tokio::task::JoinHandle<()>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Block until the service shuts down (via signal or explicit shutdown).
    pub async fn wait(self) -> Result<(), ServiceError> {
        let _ = self.graceful_waiter.await;

        let joined = timeout(FINAL_SHUTDOWN_TIMEOUT, self.server)
            .await
            .map_err(|_| ServiceError::ShutdownTimeout(FINAL_SHUTDOWN_TIMEOUT))?;
        if let Err(e) = joined {
            tracing::error!("API server task failed: {}", e);
        }
        Ok(())
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Initialize logging and the panic handler.
/// Returns guards that must be kept alive for the duration of the program.
fn init_logging(
    service_config: &ServiceConfig,
) -> Vec<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let mut guards = Vec::new();

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(stdout_guard);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(env_filter(service_config.log_level));

    if let Some(log_dir) = &service_config.log_dir {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!(
                "Warning: Failed to create log directory {:?}: {}",
                log_dir, e
            );
        }

        let file_appender = tracing_appender::rolling::daily(log_dir, "sepa.log");
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        guards.push(file_guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter(service_config.log_level));

        tracing_subscriber::registry()
            .with(stdout_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry().with(stdout_layer).init();
    }

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

/// `RUST_LOG` if set, otherwise the configured level
fn env_filter(level: tracing::Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Build state and spawn the API server, returning the state handle.
///
/// The returned `ShutdownHandle` must be kept alive; dropping it does not stop the service.
pub async fn start_service(
    service_config: &ServiceConfig,
) -> Result<(ServiceState, ShutdownHandle), ServiceError> {
    let (graceful_waiter, shutdown_tx, shutdown_rx) = utils::graceful_shutdown_blocker()?;
    let state = ServiceState::from_config(service_config)?;

    let api_config =
        http_server::Config::new(service_config.listen_addr, service_config.log_level);
    tokio::spawn(sweep_channels(
        state.clone(),
        CHANNEL_SWEEP_INTERVAL,
        shutdown_rx.clone(),
    ));

    let api_state = state.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = http_server::run_api(api_config, api_state, shutdown_rx).await {
            tracing::error!("API server error: {}", e);
        }
    });

    tracing::info!("Running: API on {}", service_config.listen_addr);

    let handle = ShutdownHandle {
        graceful_waiter,
        server,
        shutdown_tx,
    };

    Ok((state, handle))
}

/// Periodically drop channels whose hosts went quiet, until shutdown
async fn sweep_channels(
    state: ServiceState,
    every: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match state.channels().sweep_idle() {
                    Ok(0) => {}
                    Ok(dropped) => tracing::info!(dropped, "swept idle channels"),
                    Err(e) => tracing::error!("channel sweep failed: {}", e),
                }
            }
            _ = shutdown_rx.changed() => {
                tracing::debug!("channel sweeper stopping");
                return;
            }
        }
    }
}

/// Spawns the service with logging set up.
/// Blocks until shutdown signal is received. Use for CLI binary usage.
pub async fn spawn_service(service_config: &ServiceConfig) -> Result<(), ServiceError> {
    let _guards = init_logging(service_config);
    let (_, handle) = start_service(service_config).await.map_err(|e| {
        tracing::error!("error starting service: {}", e);
        e
    })?;
    handle.wait().await
}

#[cfg(test)]
mod test {
    use common::channel::ChannelRegistry;

    use super::*;

    #[tokio::test]
    async fn test_sweeper_drops_idle_channels_and_stops() {
        let state = ServiceState::from_config(&ServiceConfig::default())
            .unwrap()
            .with_channels(ChannelRegistry::with_limits(Duration::from_millis(1), 4));
        state.channels().host("stale", "123456").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let (tx, rx) = watch::channel(());
        let sweeper = tokio::spawn(sweep_channels(
            state.clone(),
            Duration::from_millis(10),
            rx,
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(state.channels().is_empty().unwrap());

        tx.send(()).unwrap();
        timeout(Duration::from_secs(1), sweeper)
            .await
            .unwrap()
            .unwrap();
    }
}
