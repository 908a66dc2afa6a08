//! Admin access to the source credibility table.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use conductdb_evidence::{CredibilityListing, CredibilityRecord};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_evidence_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct UpdateCredibilityRequest {
    pub base: Option<f64>,
    pub dynamic: Option<f64>,
}

/// GET /api/v1/credibility
pub(super) async fn list_credibility(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<CredibilityListing>>>, ApiError> {
    let rows = state
        .verifier
        .credibility()
        .snapshot()
        .map_err(|e| map_evidence_error(&req_id.0, &e))?;
    Ok(ApiResponse::new(rows, req_id.0))
}

/// PUT /api/v1/credibility/{source}
///
/// Sets `base`, `dynamic`, or both. A missing field keeps its current value.
pub(super) async fn update_credibility(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(source): Path<String>,
    Json(body): Json<UpdateCredibilityRequest>,
) -> Result<Json<ApiResponse<CredibilityListing>>, ApiError> {
    let rid = &req_id.0;
    let store = state.verifier.credibility();
    let result: Result<CredibilityRecord, _> = match (body.base, body.dynamic) {
        (Some(base), Some(dynamic)) => store.upsert(&source, base, dynamic),
        (Some(base), None) => store.set_base(&source, base),
        (None, Some(dynamic)) => store.set_dynamic(&source, dynamic),
        (None, None) => {
            return Err(ApiError::new(
                rid,
                "validation_error",
                "provide at least one of 'base' or 'dynamic'",
            ))
        }
    };
    let record = result.map_err(|e| map_evidence_error(rid, &e))?;

    tracing::info!(
        source = %source,
        base = record.base,
        dynamic = record.dynamic,
        "credibility updated"
    );
    Ok(ApiResponse::new(
        CredibilityListing {
            source: source.trim().to_string(),
            base: record.base,
            dynamic: record.dynamic,
            effective: record.effective(),
        },
        req_id.0,
    ))
}
