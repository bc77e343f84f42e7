//! Fixed-window rate limiting for the public API
//!
//! Every source address gets `max_requests` per `window_secs`. The window
//!  starts with the first request an address makes and resets once it has
//!  fully elapsed; requests over budget are answered with `429` and never
//!  reach a handler.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::RateLimitConfig;
use crate::ServiceState;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

/// Stale windows are swept once the table holds this many addresses
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limit exceeded, retry in {0:?}")]
    Exceeded(Duration),
    #[error("rate limiter state poisoned")]
    Poisoned,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count a request from `addr`
    pub fn check(&self, addr: IpAddr) -> Result<(), RateLimitError> {
        self.check_at(addr, Instant::now())
    }

    /// Count a request from `addr` arriving at `now`
    pub fn check_at(&self, addr: IpAddr, now: Instant) -> Result<(), RateLimitError> {
        let mut windows = self.windows.lock().map_err(|_| RateLimitError::Poisoned)?;

        if windows.len() >= SWEEP_THRESHOLD {
            let span = self.window;
            windows.retain(|_, w| now.saturating_duration_since(w.started) < span);
        }

        let window = windows.entry(addr).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.max_requests {
            let retry_in = self.window.saturating_sub(elapsed);
            return Err(RateLimitError::Exceeded(retry_in));
        }

        window.count += 1;
        Ok(())
    }
}

/// Axum middleware guarding a router with the state's limiter
///
/// Requests without connection info (in-process callers) share one bucket.
pub async fn middleware(
    State(state): State<ServiceState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let addr = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match state.limiter().check(addr) {
        Ok(()) => next.run(request).await,
        Err(RateLimitError::Exceeded(retry_in)) => {
            tracing::warn!(%addr, retry_in = ?retry_in, "rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "error": RATE_LIMITED_MESSAGE })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("rate limiter failure: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal server error" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window_secs,
        })
    }

    fn addr(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_allows_up_to_budget() {
        let limiter = limiter(3, 60);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at(addr(1), now).is_ok());
        }
        assert!(matches!(
            limiter.check_at(addr(1), now),
            Err(RateLimitError::Exceeded(_))
        ));
    }

    #[test]
    fn test_addresses_are_independent() {
        let limiter = limiter(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at(addr(1), now).is_ok());
        assert!(limiter.check_at(addr(1), now).is_err());
        assert!(limiter.check_at(addr(2), now).is_ok());
    }

    #[test]
    fn test_window_resets() {
        let limiter = limiter(2, 60);
        let start = Instant::now();

        assert!(limiter.check_at(addr(1), start).is_ok());
        assert!(limiter.check_at(addr(1), start).is_ok());
        assert!(limiter
            .check_at(addr(1), start + Duration::from_secs(59))
            .is_err());
        assert!(limiter
            .check_at(addr(1), start + Duration::from_secs(60))
            .is_ok());
    }

    #[test]
    fn test_retry_hint_counts_down() {
        let limiter = limiter(1, 60);
        let start = Instant::now();

        limiter.check_at(addr(1), start).unwrap();
        assert_eq!(
            limiter.check_at(addr(1), start + Duration::from_secs(20)),
            Err(RateLimitError::Exceeded(Duration::from_secs(40)))
        );
    }
}
