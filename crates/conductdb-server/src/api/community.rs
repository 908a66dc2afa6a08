use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use conductdb_core::{BrandId, Category};
use conductdb_scoring::{aggregate, CommunityCategoryOutlook, Rating};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct RatingInput {
    pub category: String,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct SubmitRatingsRequest {
    pub ratings: Vec<RatingInput>,
}

#[derive(Debug, Serialize)]
pub(super) struct SubmitRatingsResponse {
    pub accepted: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct CommunityOutlook {
    pub brand_id: BrandId,
    pub categories: Vec<CommunityCategoryOutlook>,
}

/// POST /api/v1/brands/{brand_id}/ratings
///
/// The whole batch is rejected if any rating falls outside 1–5.
pub(super) async fn submit_ratings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(brand_id): Path<BrandId>,
    Json(body): Json<SubmitRatingsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmitRatingsResponse>>), ApiError> {
    if body.ratings.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "ratings must not be empty",
        ));
    }

    let ratings = body
        .ratings
        .iter()
        .map(|r| Rating::new(Category::from_label(&r.category), r.value))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let accepted = ratings.len();
    let total = state.repo.add_ratings(brand_id, ratings).await;
    Ok((
        StatusCode::CREATED,
        ApiResponse::new(SubmitRatingsResponse { accepted, total }, req_id.0),
    ))
}

/// GET /api/v1/brands/{brand_id}/community
pub(super) async fn get_community_outlook(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(brand_id): Path<BrandId>,
) -> Json<ApiResponse<CommunityOutlook>> {
    let ratings = state.repo.ratings(brand_id).await;
    ApiResponse::new(
        CommunityOutlook {
            brand_id,
            categories: aggregate(&ratings),
        },
        req_id.0,
    )
}
