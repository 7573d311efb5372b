//! Per-client request throttling for the outline API.
//!
//! A signed-in caller is metered by user id, so one account shares a single
//! budget across devices and addresses. Anonymous traffic (register, login,
//! the public LLM action) is metered by client address. Each client gets a
//! token bucket of `burst` requests refilled at `per_sec`.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use brainflow_shared::session::TokenKind;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::api::AppState;
use crate::auth::bearer_token;
use crate::error::ServerError;

/// Who a bucket belongs to: a signed-in user, or an anonymous address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    User(String),
    Ip(IpAddr),
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKey::User(id) => write!(f, "user:{id}"),
            ClientKey::Ip(ip) => write!(f, "ip:{ip}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Quota {
    per_sec: f64,
    burst: f64,
}

#[derive(Debug)]
struct Allowance {
    remaining: f64,
    seen: Instant,
}

impl Allowance {
    fn full(quota: Quota, now: Instant) -> Self {
        Self {
            remaining: quota.burst,
            seen: now,
        }
    }

    /// Credit the time since the last request, then spend one request.
    fn spend(&mut self, quota: Quota, now: Instant) -> bool {
        let earned = now.duration_since(self.seen).as_secs_f64() * quota.per_sec;
        self.remaining = (self.remaining + earned).min(quota.burst);
        self.seen = now;

        if self.remaining < 1.0 {
            return false;
        }
        self.remaining -= 1.0;
        true
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    clients: Arc<Mutex<HashMap<ClientKey, Allowance>>>,
    quota: Quota,
}

impl RateLimiter {
    pub fn new(per_sec: f64, burst: f64) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            quota: Quota { per_sec, burst },
        }
    }

    /// Whether `client` may make another request right now.
    pub async fn allow(&self, client: ClientKey) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        clients
            .entry(client)
            .or_insert_with(|| Allowance::full(self.quota, now))
            .spend(self.quota, now)
    }

    /// Forget clients that have been quiet for `idle`. A returning client
    /// starts again with a full burst.
    pub async fn forget_idle(&self, idle: Duration) {
        let now = Instant::now();
        self.clients
            .lock()
            .await
            .retain(|_, allowance| now.duration_since(allowance.seen) < idle);
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ServerError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    if let Some(client) = identify(&state, req.headers(), peer) {
        if !state.rate_limiter.allow(client.clone()).await {
            warn!(%client, "request throttled");
            return Err(ServerError::TooManyRequests);
        }
    }

    Ok(next.run(req).await)
}

/// The bearer subject when the access token verifies, else the caller's
/// address.
fn identify(state: &AppState, headers: &HeaderMap, peer: Option<IpAddr>) -> Option<ClientKey> {
    let subject = bearer_token(headers)
        .and_then(|token| state.tokens.verify(token, TokenKind::Access, Utc::now()).ok())
        .map(|claims| claims.sub);
    match subject {
        Some(sub) => Some(ClientKey::User(sub)),
        None => peer.or_else(|| forwarded_ip(headers)).map(ClientKey::Ip),
    }
}

/// Address reported by a fronting proxy: first hop of X-Forwarded-For,
/// then X-Real-IP.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .and_then(|hop| hop.trim().parse().ok())
        .or_else(|| header("x-real-ip").and_then(|v| v.trim().parse().ok()))
}
