use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use conductdb_core::AppConfig;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// API key auth settings used by middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<Vec<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from the configured bearer tokens.
    ///
    /// In development, an empty key list disables auth for local iteration.
    /// In non-development envs, an empty key list fails startup.
    pub fn new(keys: &[String], is_development: bool) -> anyhow::Result<Self> {
        let mut keys: Vec<String> = keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        keys.sort();
        keys.dedup();

        if keys.is_empty() {
            if is_development {
                tracing::warn!(
                    "CONDUCTDB_API_KEYS not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    api_keys: Arc::new(Vec::new()),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "CONDUCTDB_API_KEYS is required outside development; provide comma-separated bearer tokens"
            );
        }

        Ok(Self {
            api_keys: Arc::new(keys),
            enabled: true,
        })
    }

    /// Compares against every key so timing does not reveal which one matched.
    fn allows(&self, token: &str) -> bool {
        self.api_keys
            .iter()
            .fold(subtle::Choice::from(0), |found, key| {
                found | token.as_bytes().ct_eq(key.as_bytes())
            })
            .into()
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

#[derive(Debug, Default)]
struct BucketTable {
    buckets: HashMap<String, Bucket>,
    pruned_at: Option<Instant>,
}

/// Per-caller token bucket limiter.
///
/// Buckets live in process memory, so limits are per instance. A bucket left
/// idle long enough to refill completely is dropped; a caller returning after
/// that starts from a fresh full bucket, which is the same state.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    capacity: f64,
    refill_per_sec: f64,
    /// Time for an empty bucket to refill. `None` when buckets never refill.
    idle_after: Option<Duration>,
    table: Arc<Mutex<BucketTable>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        let capacity = f64::from(capacity.max(1));
        let refill_per_sec = if refill_per_sec.is_finite() {
            refill_per_sec.max(0.0)
        } else {
            0.0
        };
        let idle_after = if refill_per_sec > 0.0 {
            Duration::try_from_secs_f64(capacity / refill_per_sec).ok()
        } else {
            None
        };
        Self {
            capacity,
            refill_per_sec,
            idle_after,
            table: Arc::new(Mutex::new(BucketTable::default())),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.rate_limit_capacity, config.rate_limit_refill_per_sec)
    }

    pub async fn try_acquire_at(&self, key: &str, now: Instant) -> bool {
        let mut table = self.table.lock().await;
        self.prune_idle(&mut table, now);

        let bucket = table.buckets.entry(key.to_owned()).or_insert(Bucket {
            tokens: self.capacity,
            refilled_at: now,
        });

        let elapsed = now.saturating_duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop full-again buckets, scanning at most once per refill period.
    fn prune_idle(&self, table: &mut BucketTable, now: Instant) {
        let Some(idle_after) = self.idle_after else {
            return;
        };
        let due = table
            .pruned_at
            .is_none_or(|at| now.saturating_duration_since(at) >= idle_after);
        if !due {
            return;
        }
        let before = table.buckets.len();
        table
            .buckets
            .retain(|_, b| now.saturating_duration_since(b.refilled_at) < idle_after);
        table.pruned_at = Some(now);
        let dropped = before - table.buckets.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = table.buckets.len(), "pruned idle rate-limit buckets");
        }
    }

    pub async fn try_acquire(&self, key: &str) -> bool {
        self.try_acquire_at(key, Instant::now()).await
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing Bearer token auth when enabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => ApiError::new(
            request_id_of(&req),
            "unauthorized",
            "missing or invalid bearer token",
        )
        .into_response(),
    }
}

/// Middleware enforcing the per-caller token bucket.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let key = caller_key(req.headers());
    if !rate_limit.try_acquire(&key).await {
        tracing::debug!(caller = %redact(&key), "rate limit exceeded");
        return ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
            .into_response();
    }

    next.run(req).await
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default()
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

/// Bucket key: bearer token, else first `x-forwarded-for` hop, else `anonymous`.
fn caller_key(headers: &HeaderMap) -> String {
    if let Some(token) = extract_bearer_token(headers.get(AUTHORIZATION)) {
        return format!("token:{token}");
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map_or_else(|| "anonymous".to_string(), |ip| format!("ip:{ip}"))
}

fn redact(key: &str) -> &str {
    if key.starts_with("token:") {
        "token:***"
    } else {
        key
    }
}
