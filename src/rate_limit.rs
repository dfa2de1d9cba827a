use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::AppError;
use crate::metrics::RATE_LIMITED;

// Rate limit entry - tracks requests per client IP
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

// Gate settings for one route
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    // when set, the first address in this header wins over the socket address
    pub trusted_header: Option<HeaderName>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1,
            window: Duration::from_secs(60),
            trusted_header: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Admit { remaining: u32, reset_in: Duration },
    Reject { retry_after: Duration },
}

impl GateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, GateDecision::Admit { .. })
    }
}

// Fixed-window gate, one record per client address.
// The entry guard is held across reset/increment/compare.
pub struct RequestGate {
    entries: DashMap<IpAddr, RateLimitEntry>,
    config: RateLimitConfig,
}

impl RequestGate {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    pub fn limit(&self) -> u32 {
        self.config.max_requests
    }

    pub fn check(&self, key: IpAddr, now: Instant) -> GateDecision {
        let mut entry = self.entries.entry(key).or_insert_with(|| RateLimitEntry {
            count: 0,
            window_start: now,
        });

        // window expired..? start a new one
        if now.saturating_duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);
        let reset_in = self
            .config
            .window
            .saturating_sub(now.saturating_duration_since(entry.window_start));

        if entry.count > self.config.max_requests {
            GateDecision::Reject {
                retry_after: reset_in,
            }
        } else {
            GateDecision::Admit {
                remaining: self.config.max_requests - entry.count,
                reset_in,
            }
        }
    }

    // Drop every record whose window has elapsed, returns how many went
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.window_start) < self.config.window);
        before.saturating_sub(self.entries.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.entries.len()
    }

    pub fn client_ip(&self, request: &Request) -> IpAddr {
        if let Some(name) = &self.config.trusted_header {
            let forwarded = request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok());
            if let Some(ip) = forwarded {
                return ip;
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

// Middleware - admits or rejects before the handler runs
pub async fn gate_requests(
    State(gate): State<Arc<RequestGate>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = gate.client_ip(&request);

    match gate.check(ip, Instant::now()) {
        GateDecision::Admit {
            remaining,
            reset_in,
        } => {
            debug!(%ip, remaining, "request admitted");
            let mut response = next.run(request).await;
            set_rate_limit_headers(response.headers_mut(), gate.limit(), remaining, reset_in);
            response
        }
        GateDecision::Reject { retry_after } => {
            RATE_LIMITED.inc();
            debug!(%ip, retry_after_secs = retry_after.as_secs(), "request rejected by gate");
            let mut response = AppError::RateLimited { retry_after }.into_response();
            set_rate_limit_headers(response.headers_mut(), gate.limit(), 0, retry_after);
            response
        }
    }
}

pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 { secs + 1 } else { secs }
}

fn set_rate_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_in: Duration) {
    headers.insert("ratelimit-limit", HeaderValue::from(limit));
    headers.insert("ratelimit-remaining", HeaderValue::from(remaining));
    headers.insert("ratelimit-reset", HeaderValue::from(ceil_secs(reset_in)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn gate(max_requests: u32, window_secs: u64) -> RequestGate {
        RequestGate::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
            trusted_header: None,
        })
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn second_request_in_window_is_rejected() {
        let gate = gate(1, 60);
        let t0 = Instant::now();

        assert!(gate.check(ip(1), t0).is_admitted());
        match gate.check(ip(1), t0 + Duration::from_secs(30)) {
            GateDecision::Reject { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(30));
            }
            other => panic!("expected reject, got {other:?}"),
        }
    }

    #[test]
    fn new_window_admits_again() {
        let gate = gate(1, 60);
        let t0 = Instant::now();

        assert!(gate.check(ip(1), t0).is_admitted());
        assert!(!gate.check(ip(1), t0 + Duration::from_secs(1)).is_admitted());
        assert!(gate.check(ip(1), t0 + Duration::from_secs(61)).is_admitted());
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let gate = gate(1, 60);
        let t0 = Instant::now();

        assert!(gate.check(ip(1), t0).is_admitted());
        assert!(gate.check(ip(1), t0 + Duration::from_secs(60)).is_admitted());
    }

    #[test]
    fn clients_are_counted_separately() {
        let gate = gate(1, 60);
        let t0 = Instant::now();

        assert!(gate.check(ip(1), t0).is_admitted());
        assert!(gate.check(ip(2), t0).is_admitted());
        assert!(!gate.check(ip(1), t0).is_admitted());
    }

    #[test]
    fn remaining_counts_down() {
        let gate = gate(3, 60);
        let t0 = Instant::now();

        let remaining: Vec<u32> = (0..3)
            .map(|_| match gate.check(ip(1), t0) {
                GateDecision::Admit { remaining, .. } => remaining,
                GateDecision::Reject { .. } => panic!("should not be limited yet"),
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);
        assert!(!gate.check(ip(1), t0).is_admitted());
    }

    #[test]
    fn sweep_drops_only_expired_records() {
        let gate = gate(1, 60);
        let t0 = Instant::now();

        gate.check(ip(1), t0);
        gate.check(ip(2), t0 + Duration::from_secs(40));
        assert_eq!(gate.tracked_clients(), 2);

        let removed = gate.sweep(t0 + Duration::from_secs(70));
        assert_eq!(removed, 1);
        assert_eq!(gate.tracked_clients(), 1);
        assert!(!gate.check(ip(2), t0 + Duration::from_secs(70)).is_admitted());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_admit_exactly_one() {
        let gate = Arc::new(gate(1, 60));
        let now = Instant::now();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move { gate.check(ip(7), now).is_admitted() })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[test]
    fn identity_prefers_trusted_header() {
        let gate = RequestGate::new(RateLimitConfig {
            trusted_header: Some(HeaderName::from_static("x-forwarded-for")),
            ..Default::default()
        });
        let mut request = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 5], 4000))));

        assert_eq!(gate.client_ip(&request), "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn identity_ignores_header_unless_trusted() {
        let gate = gate(1, 60);
        let mut request = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 5], 4000))));

        assert_eq!(gate.client_ip(&request), "192.168.1.5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn reset_seconds_round_up() {
        assert_eq!(ceil_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ceil_secs(Duration::from_secs(60)), 60);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }
}
