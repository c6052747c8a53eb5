//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use talentforge_common::errors::{AppError, Result};

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared limiter plus the rate it enforces, for the 429 body
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<GlobalRateLimiter>,
    per_second: u32,
}

impl Throttle {
    /// Create a new rate limiter; zero values fall back to one request
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(per_second);
        let quota = Quota::per_second(per_second).allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            per_second: per_second.get(),
        }
    }

    fn admit(&self) -> Result<()> {
        self.limiter.check().map_err(|_| AppError::RateLimited {
            limit: self.per_second,
        })
    }
}

/// Rate limiting middleware
pub async fn rate_limit(
    State(throttle): State<Throttle>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if let Err(err) = throttle.admit() {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        return Err(err);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let throttle = Throttle::new(100, 200);
        assert!(throttle.admit().is_ok());
    }

    #[test]
    fn test_middleware_answers_429_once_burst_is_spent() {
        use axum::{body::Body, http::StatusCode, routing::get, Router};
        use tower::ServiceExt;

        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(Throttle::new(1, 1), rate_limit));
        let call = || {
            let request = Request::builder().uri("/").body(Body::empty()).unwrap();
            tokio_test::block_on(app.clone().oneshot(request)).unwrap()
        };

        assert_eq!(call().status(), StatusCode::OK);
        assert_eq!(call().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_burst_exhausted() {
        let throttle = Throttle::new(1, 2);
        assert!(throttle.admit().is_ok());
        assert!(throttle.admit().is_ok());
        assert!(matches!(throttle.admit(), Err(AppError::RateLimited { limit: 1 })));
    }
}
