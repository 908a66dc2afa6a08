use axum::{extract::State, Extension, Json};
use conductdb_core::JobSummary;

use crate::jobs::{run_recompute, run_sweep};
use crate::middleware::RequestId;

use super::{ApiResponse, AppState};

/// POST /api/v1/jobs/sweep
pub(super) async fn trigger_sweep(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<JobSummary>> {
    tracing::info!(request_id = %req_id.0, "on-demand verification sweep");
    ApiResponse::new(run_sweep(&state).await, req_id.0)
}

/// POST /api/v1/jobs/recompute
pub(super) async fn trigger_recompute(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<JobSummary>> {
    tracing::info!(request_id = %req_id.0, "on-demand score recompute");
    ApiResponse::new(run_recompute(&state).await, req_id.0)
}
