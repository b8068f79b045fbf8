use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use deckforge_core::AppError;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

use crate::auth::client_ip::extract_client_ip;
use crate::constants::API_KEY_HEADER;
use crate::error::HttpAppError;

/// Clients tracked at once; beyond this the window closest to expiry is dropped.
const MAX_TRACKED_CLIENTS: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct FailureWindow {
    failures: u32,
    closes_at: Instant,
}

impl FailureWindow {
    fn is_open(&self, now: Instant) -> bool {
        now < self.closes_at
    }
}

/// Throttles clients that keep presenting a wrong API key.
///
/// Each client gets a fixed window starting at its first failure. Once
/// `max_failures` land inside the window the client is refused until it closes.
#[derive(Clone)]
pub struct AuthFailureLimiter {
    windows: Arc<Mutex<HashMap<String, FailureWindow>>>,
    max_failures: u32,
    window: Duration,
    max_clients: usize,
}

impl AuthFailureLimiter {
    pub fn new(max_failures: u32, window_seconds: u64) -> Self {
        Self::with_capacity(max_failures, window_seconds, MAX_TRACKED_CLIENTS)
    }

    fn with_capacity(max_failures: u32, window_seconds: u64, max_clients: usize) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_failures,
            window: Duration::from_secs(window_seconds),
            max_clients: max_clients.max(1),
        }
    }

    /// Count a failure for `client`; true once it has used up its allowance.
    pub async fn record_failure(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if !windows.contains_key(client) {
            windows.retain(|_, w| w.is_open(now));
            if windows.len() >= self.max_clients {
                let closest = windows
                    .iter()
                    .min_by_key(|(_, w)| w.closes_at)
                    .map(|(key, _)| key.clone());
                if let Some(key) = closest {
                    windows.remove(&key);
                }
            }
        }

        let window = windows
            .entry(client.to_string())
            .and_modify(|w| {
                if !w.is_open(now) {
                    w.failures = 0;
                    w.closes_at = now + self.window;
                }
            })
            .or_insert(FailureWindow {
                failures: 0,
                closes_at: now + self.window,
            });
        window.failures += 1;
        window.failures >= self.max_failures
    }

    pub async fn is_blocked(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        match windows.get(client).copied() {
            Some(w) if w.is_open(now) => w.failures >= self.max_failures,
            Some(_) => {
                windows.remove(client);
                false
            }
            None => false,
        }
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub master_api_key: String,
    pub auth_failure_limiter: Option<Arc<AuthFailureLimiter>>,
    /// See [`extract_client_ip`]
    pub trusted_proxy_count: usize,
}

/// Constant-time key comparison; keys of different lengths never match.
fn keys_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// The presented key: `X-API-Key` first, then `Authorization: Bearer <key>`.
fn presented_key(request: &Request) -> Result<&str, &'static str> {
    let headers = request.headers();
    if let Some(key) = headers.get(API_KEY_HEADER) {
        return key.to_str().map_err(|_| "Invalid API key header");
    }

    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or("Missing API key")?;
    auth_header
        .strip_prefix("Bearer ")
        .ok_or("Invalid authorization header format")
}

fn too_many_attempts() -> Response {
    (StatusCode::TOO_MANY_REQUESTS, "Too many failed auth attempts").into_response()
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        auth_state.trusted_proxy_count,
    );

    if let Some(ref limiter) = auth_state.auth_failure_limiter {
        if limiter.is_blocked(&client_ip).await {
            return too_many_attempts();
        }
    }

    let failure = match presented_key(&request) {
        Ok(key) if keys_match(key, &auth_state.master_api_key) => None,
        Ok(_) => Some("Invalid API key"),
        Err(reason) => Some(reason),
    };

    match failure {
        None => {
            tracing::debug!(client_ip = %client_ip, "Request authenticated");
            next.run(request).await
        }
        Some(reason) => {
            tracing::warn!(client_ip = %client_ip, reason, "Authentication failed");
            if let Some(ref limiter) = auth_state.auth_failure_limiter {
                if limiter.record_failure(&client_ip).await {
                    return too_many_attempts();
                }
            }
            HttpAppError(AppError::Unauthorized(reason.to_string())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("same-key", "same-key"));
        assert!(!keys_match("same-key", "other-ke"));
        assert!(!keys_match("short", "longer-key"));
        assert!(!keys_match("", "key"));
    }

    #[tokio::test]
    async fn test_limiter_blocks_after_max_failures() {
        let limiter = AuthFailureLimiter::new(3, 300);
        assert!(!limiter.record_failure("10.0.0.1").await);
        assert!(!limiter.record_failure("10.0.0.1").await);
        assert!(!limiter.is_blocked("10.0.0.1").await);
        assert!(limiter.record_failure("10.0.0.1").await);
        assert!(limiter.is_blocked("10.0.0.1").await);
        assert!(!limiter.is_blocked("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_limiter_window_expires() {
        let limiter = AuthFailureLimiter::new(1, 0);
        assert!(limiter.record_failure("10.0.0.1").await);
        assert!(!limiter.is_blocked("10.0.0.1").await);
        assert_eq!(limiter.tracked_clients().await, 0);
    }

    #[tokio::test]
    async fn test_expired_windows_are_swept_for_new_clients() {
        let limiter = AuthFailureLimiter::new(5, 0);
        for i in 0..100 {
            limiter.record_failure(&format!("10.0.1.{}", i)).await;
        }
        // Every earlier window has closed, so only the latest client remains
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[tokio::test]
    async fn test_tracked_clients_are_capped() {
        let limiter = AuthFailureLimiter::with_capacity(2, 300, 3);
        limiter.record_failure("10.0.0.1").await;
        assert!(limiter.record_failure("10.0.0.1").await);
        for client in ["10.0.0.2", "10.0.0.3", "10.0.0.4"] {
            tokio::time::sleep(Duration::from_millis(5)).await;
            limiter.record_failure(client).await;
        }

        assert_eq!(limiter.tracked_clients().await, 3);
        // The window closest to expiry made room for the newest client
        assert!(!limiter.is_blocked("10.0.0.1").await);
    }
}
