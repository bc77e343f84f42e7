use std::sync::Arc;
use std::time::Duration;

use common::channel::ChannelRegistry;
use common::paste::{MemoryPasteStore, PasteStore};

use super::service_config::Config;
use super::rate_limit::RateLimiter;

/// Main service state, cloned into every handler
#[derive(Clone)]
pub struct State {
    pastes: Arc<dyn PasteStore>,
    channels: ChannelRegistry,
    limiter: Arc<RateLimiter>,
}

impl State {
    pub fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        if config.rate_limit.max_requests == 0 || config.rate_limit.window_secs == 0 {
            return Err(StateSetupError::InvalidRateLimit);
        }
        if config.channel.idle_ttl_secs == 0 || config.channel.max_receivers == 0 {
            return Err(StateSetupError::InvalidChannelLimits);
        }

        tracing::info!(
            max_requests = config.rate_limit.max_requests,
            window_secs = config.rate_limit.window_secs,
            "using in-memory paste store"
        );

        let channels = ChannelRegistry::with_limits(
            Duration::from_secs(config.channel.idle_ttl_secs),
            config.channel.max_receivers,
        );
        Ok(Self::new(
            Arc::new(MemoryPasteStore::new()),
            RateLimiter::new(config.rate_limit),
        )
        .with_channels(channels))
    }

    /// Build state around an injected store
    pub fn new(pastes: Arc<dyn PasteStore>, limiter: RateLimiter) -> Self {
        Self {
            pastes,
            channels: ChannelRegistry::new(),
            limiter: Arc::new(limiter),
        }
    }

    /// Swap in a registry with non-default limits
    pub fn with_channels(mut self, channels: ChannelRegistry) -> Self {
        self.channels = channels;
        self
    }

    pub fn pastes(&self) -> &Arc<dyn PasteStore> {
        &self.pastes
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("rate limit needs a non-zero request budget and window")]
    InvalidRateLimit,
    #[error("channels need a non-zero idle ttl and receiver cap")]
    InvalidChannelLimits,
}
