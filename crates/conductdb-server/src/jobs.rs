//! Batch jobs shared by the cron scheduler and the on-demand endpoints.

use chrono::Utc;
use conductdb_core::JobSummary;

use crate::api::AppState;

/// Promote unverified events that two or more domains reported in the window.
pub async fn run_sweep(state: &AppState) -> JobSummary {
    tracing::info!(
        window_days = state.config.sweep_window_days,
        "verification sweep starting"
    );
    state
        .repo
        .sweep(&state.verifier, Utc::now())
        .await
        .to_summary()
}

/// Fold stored events into the per-brand ledgers for the most active brands.
pub async fn run_recompute(state: &AppState) -> JobSummary {
    let batches = state
        .repo
        .recompute_batches(state.config.recompute_top_n_brands)
        .await;
    conductdb_scoring::recompute_brands(
        &state.locks,
        batches,
        state.config.recompute_max_concurrent_brands,
    )
    .await
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use conductdb_core::{Category, IncomingEvent, IncomingSource, PerCategory};
    use conductdb_evidence::prepare_event;
    use uuid::Uuid;

    use super::*;
    use crate::api::test_state;

    fn report(brand_id: Uuid, url: &str, hours_ago: i64) -> IncomingEvent {
        IncomingEvent {
            id: None,
            brand_id,
            category: "environment".to_string(),
            title: "Globex chemical spill in river".to_string(),
            snippet: None,
            occurred_at: Utc::now() - Duration::hours(hours_ago),
            impact: PerCategory {
                environment: -12.0,
                ..PerCategory::default()
            },
            sources: vec![IncomingSource {
                url: url.to_string(),
                name: String::new(),
                published_at: None,
                is_primary: true,
            }],
            verification: None,
        }
    }

    #[tokio::test]
    async fn sweep_then_recompute_scores_the_brand() {
        let state = test_state();
        let brand = Uuid::new_v4();
        let first = report(brand, "https://www.riverwatch.net/spill", 2);
        let second = report(brand, "https://www.localnews.net/globex", 3);

        state.repo.ingest(prepare_event(first, &state.ownership)).await.unwrap();
        let merged = state
            .repo
            .ingest(prepare_event(second, &state.ownership))
            .await
            .unwrap();

        let sweep = run_sweep(&state).await;
        assert_eq!(sweep.succeeded, 1);
        assert_eq!(sweep.failed, 0);

        let recompute = run_recompute(&state).await;
        assert_eq!(recompute.failed, 0);
        assert_eq!(recompute.processed, 1);

        let ledger = state.locks.snapshot(brand).await.unwrap();
        let event = state.repo.event(merged.canonical_id()).await.unwrap().event;
        // Merged into one corroborated event with two sources: -12 × 0.75.
        assert_eq!(event.sources.len(), 2);
        assert_eq!(ledger.score(Category::Environment).score, 41.0);
    }

    #[tokio::test]
    async fn recompute_with_no_events_is_empty() {
        let state = test_state();
        let summary = run_recompute(&state).await;
        assert_eq!(summary.processed, 0);
        assert!(state.locks.is_empty());
    }
}
