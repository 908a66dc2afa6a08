mod community;
mod credibility;
mod events;
mod job_runs;
mod scores;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use conductdb_core::{AppConfig, ReferenceTables};
use conductdb_evidence::{
    CredibilityStore, DedupConfig, EvidenceError, OwnershipTable, VerificationPolicy, Verifier,
};
use conductdb_scoring::BrandLocks;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};
use crate::store::Repository;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub verifier: Arc<Verifier>,
    pub ownership: Arc<OwnershipTable>,
    pub locks: Arc<BrandLocks>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the repository, verifier, and ledgers from config and reference tables.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError`] if a credibility entry is out of range.
    pub fn new(config: Arc<AppConfig>, tables: &ReferenceTables) -> Result<Self, EvidenceError> {
        let credibility = Arc::new(CredibilityStore::from_entries(&tables.credibility)?);
        let policy = VerificationPolicy::from_config(&config, &tables.official_domains);
        let window = chrono::Duration::days(i64::from(config.sweep_window_days));

        Ok(Self {
            repo: Arc::new(Repository::new(DedupConfig::from_config(&config), window)),
            verifier: Arc::new(Verifier::new(credibility, policy)),
            ownership: Arc::new(OwnershipTable::from_entries(&tables.owners)),
            locks: Arc::new(BrandLocks::new()),
            config,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    events: usize,
    brands_scored: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_evidence_error(request_id: &str, error: &EvidenceError) -> ApiError {
    match error {
        EvidenceError::OutOfRange { .. } | EvidenceError::EmptySourceName => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        EvidenceError::CredibilityUnavailable(_) => {
            tracing::error!(error = %error, "credibility store unavailable");
            ApiError::new(request_id, "internal_error", "credibility store unavailable")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/events", post(events::ingest_event))
        .route("/api/v1/events/{event_id}", get(events::get_event))
        .route(
            "/api/v1/events/{event_id}/verify",
            post(events::verify_event),
        )
        .route(
            "/api/v1/brands/{brand_id}/scores",
            get(scores::get_brand_scores),
        )
        .route(
            "/api/v1/brands/{brand_id}/personalized",
            get(scores::get_personalized_score),
        )
        .route(
            "/api/v1/users/{user_id}/preferences",
            put(scores::put_preferences).get(scores::get_preferences),
        )
        .route(
            "/api/v1/brands/{brand_id}/ratings",
            post(community::submit_ratings),
        )
        .route(
            "/api/v1/brands/{brand_id}/community",
            get(community::get_community_outlook),
        )
        .route("/api/v1/credibility", get(credibility::list_credibility))
        .route(
            "/api/v1/credibility/{source}",
            put(credibility::update_credibility),
        )
        .route("/api/v1/jobs/sweep", post(job_runs::trigger_sweep))
        .route("/api/v1/jobs/recompute", post(job_runs::trigger_recompute))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    ApiResponse::new(
        HealthData {
            status: "ok",
            events: state.repo.event_count().await,
            brands_scored: state.locks.len(),
        },
        req_id.0,
    )
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let config = conductdb_core::config::build_app_config(|_| Err(std::env::VarError::NotPresent))
        .expect("default config");
    let tables = conductdb_core::parse_reference_tables(include_str!(
        "../../../../config/reference.yaml"
    ))
    .expect("reference tables");
    AppState::new(Arc::new(config), &tables).expect("state")
}
