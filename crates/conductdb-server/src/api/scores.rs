//! Brand scores, personalized results, and user preferences.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use conductdb_core::{BrandId, Category, UserPreferences};
use conductdb_scoring::confidence::estimate_score;
use conductdb_scoring::impact::{MAX_SCORE, MIN_SCORE};
use conductdb_scoring::{compose, DealbreakerPolicy, PersonalizedScoreResult, ScoreVisibility};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct CategoryScoreItem {
    pub category: Category,
    #[serde(flatten)]
    pub visibility: ScoreVisibility,
    pub event_count: usize,
    pub verified_count: usize,
    pub independent_owner_count: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct BrandScores {
    pub brand_id: BrandId,
    pub categories: Vec<CategoryScoreItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PersonalizedQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub(super) struct PersonalizedScore {
    pub brand_id: BrandId,
    pub user_id: Option<Uuid>,
    #[serde(flatten)]
    pub result: PersonalizedScoreResult,
}

/// GET /api/v1/brands/{brand_id}/scores
///
/// Brands never recomputed report every category as withheld.
pub(super) async fn get_brand_scores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(brand_id): Path<BrandId>,
) -> Json<ApiResponse<BrandScores>> {
    let ledger = state.locks.snapshot(brand_id).await;
    let categories = Category::ALL
        .iter()
        .map(|&category| {
            let score = ledger
                .as_ref()
                .map(|l| l.score(category).clone())
                .unwrap_or_default();
            CategoryScoreItem {
                category,
                visibility: ScoreVisibility::gate(score.score, estimate_score(&score)),
                event_count: score.event_count,
                verified_count: score.verified_count,
                independent_owner_count: score.independent_owner_count,
            }
        })
        .collect();

    ApiResponse::new(
        BrandScores {
            brand_id,
            categories,
        },
        req_id.0,
    )
}

/// GET /api/v1/brands/{brand_id}/personalized?user_id=
pub(super) async fn get_personalized_score(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(brand_id): Path<BrandId>,
    Query(query): Query<PersonalizedQuery>,
) -> Result<Json<ApiResponse<PersonalizedScore>>, ApiError> {
    let ledger = state.locks.snapshot(brand_id).await.ok_or_else(|| {
        ApiError::new(
            req_id.0.clone(),
            "not_found",
            format!("no scores computed for brand {brand_id}"),
        )
    })?;

    let preferences = match query.user_id {
        Some(user_id) => state.repo.preferences(user_id).await,
        None => None,
    };
    let policy = DealbreakerPolicy::from_config(&state.config);
    let result = compose(ledger.scores(), preferences.as_ref(), &policy);

    Ok(ApiResponse::new(
        PersonalizedScore {
            brand_id,
            user_id: query.user_id,
            result,
        },
        req_id.0,
    ))
}

fn validate_preferences(req_id: &str, preferences: &UserPreferences) -> Result<(), ApiError> {
    if let Some((category, weight)) = preferences
        .weights
        .iter()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("weight for {category} must be a non-negative number, got {weight}"),
        ));
    }
    if let Some(d) = preferences
        .dealbreakers
        .iter()
        .find(|d| !(MIN_SCORE..=MAX_SCORE).contains(&d.min_score))
    {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!(
                "dealbreaker threshold for {} must be within [0, 100], got {}",
                d.category, d.min_score
            ),
        ));
    }
    Ok(())
}

/// PUT /api/v1/users/{user_id}/preferences
pub(super) async fn put_preferences(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UserPreferences>,
) -> Result<Json<ApiResponse<UserPreferences>>, ApiError> {
    validate_preferences(&req_id.0, &body)?;
    state.repo.set_preferences(user_id, body.clone()).await;
    tracing::debug!(user_id = %user_id, "preferences updated");
    Ok(ApiResponse::new(body, req_id.0))
}

/// GET /api/v1/users/{user_id}/preferences
pub(super) async fn get_preferences(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserPreferences>>, ApiError> {
    let preferences = state.repo.preferences(user_id).await.ok_or_else(|| {
        ApiError::new(
            req_id.0.clone(),
            "not_found",
            format!("no preferences stored for user {user_id}"),
        )
    })?;
    Ok(ApiResponse::new(preferences, req_id.0))
}
