//! In-memory repository backing the HTTP surface.
//!
//! Holds events with their merged duplicates, user preferences, and
//! community ratings. All state lives behind one async `RwLock`; the
//! verification sweep runs under the write guard so it never races an
//! ingest or a synchronous verify.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use conductdb_core::{BrandId, EventId, RawEvent, UserPreferences};
use conductdb_evidence::{
    duplicate_ref, is_duplicate, merge_sources, title_similarity, DedupConfig, DuplicateRef,
    SweepReport, Verifier,
};
use conductdb_scoring::Rating;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event {0} already exists")]
    EventExists(EventId),
}

/// What happened to an ingested event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Created { event_id: EventId },
    Merged { event_id: EventId, duplicate: DuplicateRef },
}

impl IngestOutcome {
    /// Id of the canonical event the input now lives under.
    #[must_use]
    pub fn canonical_id(&self) -> EventId {
        match self {
            IngestOutcome::Created { event_id } | IngestOutcome::Merged { event_id, .. } => *event_id,
        }
    }
}

/// A canonical event and the duplicate reports folded into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub event: RawEvent,
    pub duplicates: Vec<DuplicateRef>,
}

#[derive(Debug, Default)]
struct Inner {
    events: Vec<RawEvent>,
    index: HashMap<EventId, usize>,
    /// Duplicate event id → canonical event id.
    aliases: HashMap<EventId, EventId>,
    duplicates: HashMap<EventId, Vec<DuplicateRef>>,
    preferences: HashMap<Uuid, UserPreferences>,
    ratings: HashMap<BrandId, Vec<Rating>>,
}

impl Inner {
    fn resolve(&self, id: EventId) -> Option<usize> {
        let canonical = self.aliases.get(&id).copied().unwrap_or(id);
        self.index.get(&canonical).copied()
    }

    fn find_duplicate_of(&self, event: &RawEvent, config: &DedupConfig, window: Duration) -> Option<usize> {
        if !event.title.chars().any(char::is_alphanumeric) {
            return None;
        }
        self.events.iter().position(|existing| {
            existing.brand_id == event.brand_id
                && existing.category == event.category
                && (existing.occurred_at - event.occurred_at).abs() <= window
                && is_duplicate(title_similarity(&existing.title, &event.title), config.threshold)
        })
    }
}

#[derive(Debug)]
pub struct Repository {
    inner: RwLock<Inner>,
    dedup: DedupConfig,
    /// Events further apart than this never merge.
    window: Duration,
}

impl Repository {
    #[must_use]
    pub fn new(dedup: DedupConfig, window: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            dedup,
            window,
        }
    }

    /// Store `event`, merging it into an existing near-duplicate from the
    /// same brand and category when one exists inside the window.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EventExists`] if the id was already ingested,
    /// either as a canonical event or as a merged duplicate.
    pub async fn ingest(&self, event: RawEvent) -> Result<IngestOutcome, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.index.contains_key(&event.id) || inner.aliases.contains_key(&event.id) {
            return Err(StoreError::EventExists(event.id));
        }

        if let Some(pos) = inner.find_duplicate_of(&event, &self.dedup, self.window) {
            let duplicate = duplicate_ref(&event);
            let canonical_id = inner.events[pos].id;
            if self.dedup.merge_sources {
                merge_sources(&mut inner.events[pos], &event);
            }
            inner.aliases.insert(event.id, canonical_id);
            inner
                .duplicates
                .entry(canonical_id)
                .or_default()
                .push(duplicate.clone());
            tracing::debug!(
                event_id = %event.id,
                canonical_id = %canonical_id,
                brand_id = %event.brand_id,
                "merged duplicate event"
            );
            return Ok(IngestOutcome::Merged {
                event_id: canonical_id,
                duplicate,
            });
        }

        let event_id = event.id;
        let pos = inner.events.len();
        inner.index.insert(event_id, pos);
        inner.events.push(event);
        Ok(IngestOutcome::Created { event_id })
    }

    /// The canonical event for `id`; duplicate ids resolve to their canonical.
    pub async fn event(&self, id: EventId) -> Option<EventRecord> {
        let inner = self.inner.read().await;
        let pos = inner.resolve(id)?;
        let event = inner.events[pos].clone();
        let duplicates = inner.duplicates.get(&event.id).cloned().unwrap_or_default();
        Some(EventRecord { event, duplicates })
    }

    /// Run `update` against the canonical event for `id` under the write lock.
    pub async fn update_event<T>(&self, id: EventId, update: impl FnOnce(&mut RawEvent) -> T) -> Option<T> {
        let mut inner = self.inner.write().await;
        let pos = inner.resolve(id)?;
        Some(update(&mut inner.events[pos]))
    }

    /// Run the periodic verification sweep over every stored event.
    pub async fn sweep(&self, verifier: &Verifier, now: DateTime<Utc>) -> SweepReport {
        let mut inner = self.inner.write().await;
        verifier.sweep(&mut inner.events, now)
    }

    /// Event batches for the `top_n` brands with the most recent activity.
    pub async fn recompute_batches(&self, top_n: usize) -> Vec<(BrandId, Vec<RawEvent>)> {
        let inner = self.inner.read().await;
        let mut by_brand: HashMap<BrandId, Vec<RawEvent>> = HashMap::new();
        for event in &inner.events {
            by_brand.entry(event.brand_id).or_default().push(event.clone());
        }

        let mut batches: Vec<(BrandId, Vec<RawEvent>)> = by_brand.into_iter().collect();
        batches.sort_by_key(|(brand_id, events)| {
            let latest = events.iter().map(|e| e.occurred_at).max();
            (std::cmp::Reverse(latest), *brand_id)
        });
        batches.truncate(top_n);
        batches
    }

    pub async fn event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn set_preferences(&self, user_id: Uuid, preferences: UserPreferences) {
        self.inner.write().await.preferences.insert(user_id, preferences);
    }

    pub async fn preferences(&self, user_id: Uuid) -> Option<UserPreferences> {
        self.inner.read().await.preferences.get(&user_id).cloned()
    }

    pub async fn add_ratings(&self, brand_id: BrandId, ratings: impl IntoIterator<Item = Rating>) -> usize {
        let mut inner = self.inner.write().await;
        let stored = inner.ratings.entry(brand_id).or_default();
        stored.extend(ratings);
        stored.len()
    }

    pub async fn ratings(&self, brand_id: BrandId) -> Vec<Rating> {
        self.inner
            .read()
            .await
            .ratings
            .get(&brand_id)
            .cloned()
            .unwrap_or_default()
    }
}
