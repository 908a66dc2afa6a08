//! Serialized per-brand score recomputation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use conductdb_core::{BrandId, JobSummary, RawEvent};
use futures::stream::{self, StreamExt};

use crate::impact::BrandScoreLedger;

/// Name reported in recompute job summaries.
pub const RECOMPUTE_JOB: &str = "score_recompute";

/// One ledger per brand, each behind its own async mutex.
///
/// Holding a brand's guard is what serializes writers for that brand; other
/// brands proceed independently. The outer map lock is only held while
/// looking up or inserting an entry, never across an await.
#[derive(Debug, Default)]
pub struct BrandLocks {
    ledgers: Mutex<HashMap<BrandId, Arc<tokio::sync::Mutex<BrandScoreLedger>>>>,
}

impl BrandLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The ledger for `brand_id`, created at baseline on first use.
    #[must_use]
    pub fn ledger(&self, brand_id: BrandId) -> Arc<tokio::sync::Mutex<BrandScoreLedger>> {
        let mut ledgers = self
            .ledgers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            ledgers
                .entry(brand_id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(BrandScoreLedger::new(brand_id)))),
        )
    }

    /// Existing ledger for `brand_id`, if one was ever created.
    #[must_use]
    pub fn existing(&self, brand_id: BrandId) -> Option<Arc<tokio::sync::Mutex<BrandScoreLedger>>> {
        self.ledgers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&brand_id)
            .cloned()
    }

    /// Copy of a brand's ledger, waiting for any in-flight recompute.
    pub async fn snapshot(&self, brand_id: BrandId) -> Option<BrandScoreLedger> {
        let ledger = self.existing(brand_id)?;
        let guard = ledger.lock().await;
        Some(guard.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ledgers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Apply `events` to one brand's ledger while holding that brand's lock.
pub async fn recompute_brand(locks: &BrandLocks, brand_id: BrandId, events: &[RawEvent]) -> JobSummary {
    let mut summary = JobSummary::new(RECOMPUTE_JOB);
    let ledger = locks.ledger(brand_id);
    let mut guard = ledger.lock().await;

    let (changes, failures) = guard.apply_chronological(events);
    for _ in &changes {
        summary.record_success();
    }
    for (event_id, error) in failures {
        tracing::warn!(brand_id = %brand_id, event_id = %event_id, error = %error, "skipping event during recompute");
        summary.record_failure(event_id, error.to_string());
    }

    let moved = changes.iter().filter(|c| !c.is_noop()).count();
    tracing::debug!(brand_id = %brand_id, events = events.len(), moved, "brand recompute complete");
    summary
}

/// Recompute many brands, at most `max_concurrent` at a time.
///
/// Batches for the same brand are safe to pass more than once; they queue
/// on that brand's lock.
pub async fn recompute_brands(
    locks: &BrandLocks,
    batches: Vec<(BrandId, Vec<RawEvent>)>,
    max_concurrent: usize,
) -> JobSummary {
    let brand_count = batches.len();
    tracing::info!(brands = brand_count, max_concurrent, "score recompute starting");

    let summary = stream::iter(batches)
        .map(|(brand_id, events)| async move { recompute_brand(locks, brand_id, &events).await })
        .buffer_unordered(max_concurrent.max(1))
        .fold(JobSummary::new(RECOMPUTE_JOB), |mut acc, brand| async move {
            acc.absorb(brand);
            acc
        })
        .await;

    tracing::info!(
        brands = brand_count,
        processed = summary.processed,
        failed = summary.failed,
        "score recompute complete"
    );
    summary
}
