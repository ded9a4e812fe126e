//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use contractforge_common::errors::AppError;
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Limiter plus the configured rate for error reporting
pub struct RateLimitState {
    limiter: GlobalRateLimiter,
    requests_per_second: u32,
}

/// Create a new rate limiter; zero values are raised to one
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Arc<RateLimitState> {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(rate);
    let quota = Quota::per_second(rate).allow_burst(burst);

    Arc::new(RateLimitState {
        limiter: RateLimiter::direct(quota),
        requests_per_second: rate.get(),
    })
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimitState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => Err(AppError::RateLimited {
            limit: state.requests_per_second,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_rate_limiter_creation() {
        let state = create_rate_limiter(100, 200);
        assert_ok!(state.limiter.check());
    }

    #[test]
    fn test_burst_exhaustion() {
        let state = create_rate_limiter(1, 2);
        assert_ok!(state.limiter.check());
        assert_ok!(state.limiter.check());
        assert_err!(state.limiter.check());
    }

    #[test]
    fn test_zero_rate_is_raised() {
        let state = create_rate_limiter(0, 0);
        assert_eq!(state.requests_per_second, 1);
        assert_ok!(state.limiter.check());
    }
}
