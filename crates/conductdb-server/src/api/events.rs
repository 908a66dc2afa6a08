//! Event ingestion, lookup, and the synchronous verification check.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use conductdb_core::{EventId, IncomingEvent};
use conductdb_evidence::{prepare_event, VerificationOutcome};
use serde::Serialize;

use crate::middleware::RequestId;
use crate::store::{EventRecord, IngestOutcome, StoreError};

use super::{map_evidence_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct IngestEventResponse {
    #[serde(flatten)]
    pub outcome: IngestOutcome,
    pub verification: VerificationOutcome,
}

/// Verify the canonical event for `event_id` in place.
async fn verify_stored(
    state: &AppState,
    rid: &str,
    event_id: EventId,
) -> Result<VerificationOutcome, ApiError> {
    let verifier = &state.verifier;
    let outcome = state
        .repo
        .update_event(event_id, |event| verifier.verify_event(event))
        .await
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("event {event_id} not found")))?
        .map_err(|e| map_evidence_error(rid, &e))?;

    if outcome.changed() {
        tracing::info!(
            event_id = %outcome.event_id,
            previous = %outcome.previous,
            current = %outcome.current,
            "event verification upgraded"
        );
    }
    Ok(outcome)
}

/// POST /api/v1/events — normalize, dedup against stored events, verify.
pub(super) async fn ingest_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<IncomingEvent>,
) -> Result<(StatusCode, Json<ApiResponse<IngestEventResponse>>), ApiError> {
    let rid = &req_id.0;
    if body.sources.iter().any(|s| s.url.trim().is_empty()) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "every source needs a non-empty url",
        ));
    }

    let event = prepare_event(body, &state.ownership);
    let brand_id = event.brand_id;
    let outcome = state.repo.ingest(event).await.map_err(|e| match e {
        StoreError::EventExists(_) => ApiError::new(rid, "conflict", e.to_string()),
    })?;
    let verification = verify_stored(&state, rid, outcome.canonical_id()).await?;

    let status = match outcome {
        IngestOutcome::Created { .. } => StatusCode::CREATED,
        IngestOutcome::Merged { .. } => StatusCode::OK,
    };
    tracing::debug!(
        brand_id = %brand_id,
        event_id = %outcome.canonical_id(),
        level = %verification.current,
        "event ingested"
    );

    Ok((
        status,
        ApiResponse::new(
            IngestEventResponse {
                outcome,
                verification,
            },
            req_id.0,
        ),
    ))
}

/// GET /api/v1/events/{event_id} — canonical event with its merged duplicates.
pub(super) async fn get_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(event_id): Path<EventId>,
) -> Result<Json<ApiResponse<EventRecord>>, ApiError> {
    let record = state.repo.event(event_id).await.ok_or_else(|| {
        ApiError::new(
            req_id.0.clone(),
            "not_found",
            format!("event {event_id} not found"),
        )
    })?;
    Ok(ApiResponse::new(record, req_id.0))
}

/// POST /api/v1/events/{event_id}/verify — rerun the synchronous check.
pub(super) async fn verify_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(event_id): Path<EventId>,
) -> Result<Json<ApiResponse<VerificationOutcome>>, ApiError> {
    let outcome = verify_stored(&state, &req_id.0, event_id).await?;
    Ok(ApiResponse::new(outcome, req_id.0))
}
