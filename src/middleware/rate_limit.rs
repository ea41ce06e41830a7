use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Fixed one-second window over all requests passing through the layer.
/// Coarse on purpose: the point is to keep a burst of clients from fanning
/// out into a burst of model calls.
#[derive(Clone)]
pub struct RateLimiter {
    limit: u32,
    window: Arc<Mutex<Window>>,
}

struct Window {
    opened: Instant,
    used: u32,
}

impl RateLimiter {
    pub fn new(limit_per_second: u32) -> Self {
        Self {
            limit: limit_per_second.max(1),
            window: Arc::new(Mutex::new(Window {
                opened: Instant::now(),
                used: 0,
            })),
        }
    }

    fn try_acquire(&self) -> bool {
        let mut window = self.window.lock().expect("rate limiter mutex poisoned");
        if window.opened.elapsed() >= Duration::from_secs(1) {
            window.opened = Instant::now();
            window.used = 0;
        }
        if window.used >= self.limit {
            return false;
        }
        window.used += 1;
        true
    }
}

pub async fn rps_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.try_acquire() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}
