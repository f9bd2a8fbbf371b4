// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Custom middleware

use crate::config::RateLimitConfig;
use crate::error::ServerError;
use crate::state::AppState;
use axum::{
    async_trait,
    body::{to_bytes, Body},
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use folio_api_contract::{NewSecurityEvent, Severity};
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Largest body the threat detector will buffer
const MAX_INSPECTED_BODY: usize = 10 * 1024 * 1024;

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Caller address and agent as reported by the request headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };
        let ip = header_str(header::HeaderName::from_static("x-forwarded-for"))
            .and_then(|forwarded| forwarded.split(',').next())
            .map(str::trim)
            .or_else(|| header_str(header::HeaderName::from_static("x-real-ip")))
            .map(str::to_string);
        Self {
            ip,
            user_agent: header_str(header::USER_AGENT).map(str::to_string),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Request times per client, plus when idle clients were last dropped
#[derive(Default)]
struct RateWindows {
    clients: HashMap<String, Vec<Instant>>,
    last_sweep: Option<Instant>,
}

impl RateWindows {
    /// Forget clients with nothing inside the window, at most once per window
    fn sweep(&mut self, now: Instant) {
        if self
            .last_sweep
            .is_some_and(|last| now.saturating_duration_since(last) < RATE_WINDOW)
        {
            return;
        }
        self.clients.retain(|_, times| {
            times.retain(|&time| now.saturating_duration_since(time) < RATE_WINDOW);
            !times.is_empty()
        });
        self.last_sweep = Some(now);
    }
}

/// Rate limiting state
#[derive(Clone)]
pub struct RateLimitState {
    requests: Arc<Mutex<RateWindows>>,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            requests: Arc::new(Mutex::new(RateWindows::default())),
            config,
        }
    }

    /// Record a request for `key`; false when the key is over its limit
    pub async fn check_rate_limit(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.requests.lock().await;
        windows.sweep(now);
        let client_requests = windows.clients.entry(key.to_string()).or_default();

        // Sliding window
        client_requests.retain(|&time| now.saturating_duration_since(time) < RATE_WINDOW);

        if client_requests.len() < self.config.requests_per_minute as usize {
            client_requests.push(now);
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.requests.lock().await.clients.len()
    }
}

/// Per-client request budget keyed on `x-forwarded-for`
pub async fn rate_limit_middleware(
    state: Arc<RateLimitState>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let client_ip = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    if state.check_rate_limit(&client_ip).await {
        Ok(next.run(req).await)
    } else {
        tracing::debug!(client = %client_ip, "rate limit exceeded");
        Err(ServerError::RateLimited)
    }
}

/// Refuse callers whose address is on the block list
pub async fn ip_block_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if let Some(ip) = ClientInfo::from_headers(req.headers()).ip {
        if state.security.is_blocked(&ip)? {
            tracing::info!(%ip, path = %req.uri().path(), "blocked address refused");
            return Err(ServerError::Authorization("Access denied".to_string()));
        }
    }
    Ok(next.run(req).await)
}

/// Reject write requests whose body matches a threat pattern
pub async fn threat_detection_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if !matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) {
        return Ok(next.run(req).await);
    }

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_INSPECTED_BODY)
        .await
        .map_err(|_| ServerError::BadRequest("request body too large".to_string()))?;

    let content = String::from_utf8_lossy(&bytes);
    if state.security.detector().is_threat(&content) {
        let client = ClientInfo::from_headers(&parts.headers);
        let event = NewSecurityEvent::new(
            "threat_detected",
            Severity::High,
            format!("Malicious content in {} {}", parts.method, parts.uri.path()),
        )
        .details(json!({ "method": parts.method.as_str(), "path": parts.uri.path() }))
        .ip(client.ip)
        .user_agent(client.user_agent);
        if let Err(err) = state.security.log_event(event).await {
            tracing::error!(error = %err, "failed to record threat");
        }
        return Err(ServerError::BadRequest("Invalid request content".to_string()));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn window_slides() {
        let limiter = RateLimitState::new(RateLimitConfig {
            requests_per_minute: 2,
        });
        let start = Instant::now();
        assert!(limiter.check_at("a", start).await);
        assert!(limiter.check_at("a", start).await);
        assert!(!limiter.check_at("a", start + Duration::from_secs(30)).await);
        assert!(limiter.check_at("b", start).await);
        assert!(limiter.check_at("a", start + Duration::from_secs(61)).await);
    }

    #[tokio::test]
    async fn idle_clients_are_forgotten() {
        let limiter = RateLimitState::new(RateLimitConfig {
            requests_per_minute: 5,
        });
        let start = Instant::now();
        for n in 0..1000 {
            assert!(limiter.check_at(&format!("10.0.{}.{}", n / 256, n % 256), start).await);
        }
        assert_eq!(limiter.tracked_clients().await, 1000);

        assert!(limiter.check_at("10.9.9.9", start + Duration::from_secs(120)).await);
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[test]
    fn client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8"));
        let client = ClientInfo::from_headers(&headers);
        assert_eq!(client.ip.as_deref(), Some("203.0.113.5"));
        assert_eq!(client.user_agent.as_deref(), Some("curl/8"));

        headers.remove("x-forwarded-for");
        assert_eq!(ClientInfo::from_headers(&headers).ip.as_deref(), Some("10.0.0.9"));
        assert_eq!(ClientInfo::from_headers(&HeaderMap::new()), ClientInfo::default());
    }
}
