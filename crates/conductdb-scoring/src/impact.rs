//! Category impact scoring.
//!
//! Scores are running accumulators: each event nudges the current value by
//! its verification-weighted impact. Application order matters, so events
//! for one brand are applied oldest-first and one brand is never updated by
//! two writers at once (see [`crate::recompute`]).

use std::collections::{HashMap, HashSet};

use conductdb_core::{Category, PerCategory, RawEvent, VerificationLevel, MAX_EVENT_IMPACT};
use conductdb_evidence::ownership::owner_key;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScoringError;

/// Score every category starts from.
pub const BASELINE_SCORE: f64 = 50.0;
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// How much of an event's declared impact reaches the score.
#[must_use]
pub fn verification_factor(level: VerificationLevel, source_count: usize) -> f64 {
    match level {
        VerificationLevel::Official => 1.0,
        VerificationLevel::Corroborated => 0.75,
        VerificationLevel::Unverified if source_count >= 2 => 0.25,
        // A single unverified report is informational only.
        VerificationLevel::Unverified => 0.0,
    }
}

/// `clamp(impact × factor, -20, 20)`; non-finite input yields `0.0`.
#[must_use]
pub fn effective_delta(impact: f64, factor: f64) -> f64 {
    let delta = impact * factor;
    if delta.is_finite() {
        delta.clamp(-MAX_EVENT_IMPACT, MAX_EVENT_IMPACT)
    } else {
        0.0
    }
}

/// `clamp(old + delta, 0, 100)`.
#[must_use]
pub fn apply_delta(old: f64, delta: f64) -> f64 {
    (old + delta).clamp(MIN_SCORE, MAX_SCORE)
}

/// One category's running score and the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: f64,
    pub event_count: usize,
    pub verified_count: usize,
    pub independent_owner_count: usize,
}

impl Default for CategoryScore {
    fn default() -> Self {
        Self {
            score: BASELINE_SCORE,
            event_count: 0,
            verified_count: 0,
            independent_owner_count: 0,
        }
    }
}

/// What applying one event changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedChange {
    pub event_id: Uuid,
    pub previous_factor: f64,
    pub factor: f64,
    /// Score movement per category caused by this application.
    pub deltas: PerCategory<f64>,
}

impl AppliedChange {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.deltas.iter().all(|(_, d)| *d == 0.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct AppliedEvent {
    category: Category,
    factor: f64,
    verified: bool,
}

/// Per-brand score state.
///
/// Remembers the factor already applied for each event, so re-applying an
/// event only adds the portion its factor has grown by. Re-applying an
/// unchanged event is a no-op.
#[derive(Debug, Clone)]
pub struct BrandScoreLedger {
    brand_id: Uuid,
    scores: PerCategory<CategoryScore>,
    applied: HashMap<Uuid, AppliedEvent>,
    owners: PerCategory<HashSet<String>>,
}

impl BrandScoreLedger {
    #[must_use]
    pub fn new(brand_id: Uuid) -> Self {
        Self {
            brand_id,
            scores: PerCategory::default(),
            applied: HashMap::new(),
            owners: PerCategory::default(),
        }
    }

    #[must_use]
    pub fn brand_id(&self) -> Uuid {
        self.brand_id
    }

    #[must_use]
    pub fn scores(&self) -> &PerCategory<CategoryScore> {
        &self.scores
    }

    #[must_use]
    pub fn score(&self, category: Category) -> &CategoryScore {
        self.scores.get(category)
    }

    #[must_use]
    pub fn applied_factor(&self, event_id: Uuid) -> Option<f64> {
        self.applied.get(&event_id).map(|a| a.factor)
    }

    /// Apply (or top up) one event.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::BrandMismatch`] if the event belongs to a
    /// different brand. The ledger is unchanged in that case.
    pub fn apply(&mut self, event: &RawEvent) -> Result<AppliedChange, ScoringError> {
        if event.brand_id != self.brand_id {
            return Err(ScoringError::BrandMismatch {
                event_id: event.id,
                expected: self.brand_id,
                found: event.brand_id,
            });
        }

        let factor = verification_factor(event.verification, event.source_count());
        let verified = event.verification >= VerificationLevel::Corroborated;
        let previous = self.applied.get(&event.id).copied();
        let previous_factor = previous.map_or(0.0, |a| a.factor);
        // Factors only grow with verification; a lower one never claws back.
        let factor = factor.max(previous_factor);

        let mut deltas = PerCategory::<f64>::default();
        if factor > previous_factor {
            for (category, impact) in event.impact.iter() {
                let increment =
                    effective_delta(impact, factor) - effective_delta(impact, previous_factor);
                let slot = self.scores.get_mut(category);
                let before = slot.score;
                slot.score = apply_delta(before, increment);
                *deltas.get_mut(category) = slot.score - before;
            }
        }

        self.record_metadata(event, previous, verified);
        self.applied.insert(
            event.id,
            AppliedEvent {
                category: event.category,
                factor,
                verified: verified || previous.is_some_and(|a| a.verified),
            },
        );

        Ok(AppliedChange {
            event_id: event.id,
            previous_factor,
            factor,
            deltas,
        })
    }

    fn record_metadata(&mut self, event: &RawEvent, previous: Option<AppliedEvent>, verified: bool) {
        let category = previous.map_or(event.category, |a| a.category);
        let owners = self.owners.get_mut(category);
        owners.extend(event.sources.iter().filter_map(owner_key));
        let owner_count = owners.len();

        let slot = self.scores.get_mut(category);
        if previous.is_none() {
            slot.event_count += 1;
        }
        if verified && !previous.is_some_and(|a| a.verified) {
            slot.verified_count += 1;
        }
        slot.independent_owner_count = owner_count;
    }

    /// Apply `events` oldest-first (stable on ties), recording per-event
    /// failures instead of stopping.
    pub fn apply_chronological<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a RawEvent>,
    ) -> (Vec<AppliedChange>, Vec<(Uuid, ScoringError)>) {
        let mut ordered: Vec<&RawEvent> = events.into_iter().collect();
        ordered.sort_by_key(|e| e.occurred_at);

        let mut changes = Vec::with_capacity(ordered.len());
        let mut failures = Vec::new();
        for event in ordered {
            match self.apply(event) {
                Ok(change) => changes.push(change),
                Err(e) => failures.push((event.id, e)),
            }
        }
        (changes, failures)
    }
}

#[cfg(test)]
#[path = "impact_test.rs"]
mod tests;
