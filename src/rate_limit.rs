// src/rate_limit.rs

// Per-IP cap on report submissions over a rolling window.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Clone)]
pub struct SubmissionLimiter {
    hits: Arc<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
    max_requests: u32,
    window: Duration,
}

impl SubmissionLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            hits: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Records a hit for `ip` if under the cap, otherwise returns the
    /// seconds until the oldest hit leaves the window.
    pub async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), u64> {
        let mut hits = self.hits.lock().await;
        let log = hits.entry(ip).or_default();
        while log
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            log.pop_front();
        }

        if log.len() >= self.max_requests as usize {
            let retry_after = log
                .front()
                .map(|t| self.window.saturating_sub(now.duration_since(*t)))
                .unwrap_or(self.window);
            return Err(retry_after.as_secs().max(1));
        }
        log.push_back(now);
        Ok(())
    }

    /// Drops IPs with no hit inside the window.
    pub async fn prune(&self) {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        hits.retain(|_, log| log.back().is_some_and(|t| now.duration_since(*t) < self.window));
    }

    pub async fn tracked_ips(&self) -> usize {
        self.hits.lock().await.len()
    }
}

/// First `X-Forwarded-For` hop, then the socket peer.
pub fn client_ip(req: &Request) -> IpAddr {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn limit_submissions(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&req);
    if let Err(retry_after) = state.limiter.check(ip).await {
        tracing::warn!(%ip, retry_after, "report submission rate limited");
        return Err(AppError::RateLimited { retry_after });
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[tokio::test]
    async fn caps_each_ip_separately() {
        let limiter = SubmissionLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now).await.is_ok());
        assert!(limiter.check_at(ip(1), now).await.is_ok());
        assert!(limiter.check_at(ip(1), now).await.is_err());
        assert!(limiter.check_at(ip(2), now).await.is_ok());
    }

    #[tokio::test]
    async fn window_rolls() {
        let limiter = SubmissionLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at(ip(1), start).await.is_ok());

        let retry = limiter
            .check_at(ip(1), start + Duration::from_secs(20))
            .await
            .unwrap_err();
        assert_eq!(retry, 40);

        assert!(limiter
            .check_at(ip(1), start + Duration::from_secs(61))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn prune_forgets_idle_ips() {
        let limiter = SubmissionLimiter::new(5, Duration::from_millis(1));
        limiter.check(ip(3)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        limiter.prune().await;
        assert_eq!(limiter.tracked_ips().await, 0);
    }

    #[test]
    fn forwarded_for_wins() {
        let req = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "203.0.113.7".parse::<IpAddr>().unwrap());
    }
}
