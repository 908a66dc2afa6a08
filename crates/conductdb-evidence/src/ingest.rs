//! Turn loosely-typed ingestion records into normalized [`RawEvent`]s.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use conductdb_core::{
    Category, ImpactDeltas, IncomingEvent, IncomingSource, RawEvent, Source, VerificationLevel,
};
use uuid::Uuid;

use crate::normalize::{
    canonicalize_url, classify_link, day_bucket, registrable_domain, source_name_from_url,
    text_fingerprint,
};
use crate::ownership::{DomainOwnership, OwnershipTable};

/// Derived fields shared by every source of one event.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext {
    pub event_id: Uuid,
    pub title_fingerprint: u64,
    pub day_bucket: NaiveDate,
}

impl SourceContext {
    #[must_use]
    pub fn new(event_id: Uuid, title: &str, snippet: Option<&str>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id,
            title_fingerprint: text_fingerprint(title, snippet),
            day_bucket: day_bucket(occurred_at),
        }
    }
}

/// Normalize one incoming source.
#[must_use]
pub fn build_source(incoming: &IncomingSource, ctx: &SourceContext, owners: &OwnershipTable) -> Source {
    let canonical_url = canonicalize_url(&incoming.url);
    let domain = registrable_domain(&canonical_url);
    let ownership = domain
        .as_deref()
        .map_or_else(DomainOwnership::unknown, |d| owners.resolve(d));
    let name = match incoming.name.trim() {
        "" => source_name_from_url(&canonical_url),
        trimmed => trimmed.to_string(),
    };

    Source {
        id: Uuid::new_v4(),
        event_id: ctx.event_id,
        name,
        raw_url: incoming.url.clone(),
        link_kind: classify_link(&canonical_url),
        canonical_url,
        domain,
        owner: ownership.owner,
        owner_kind: ownership.kind,
        title_fingerprint: ctx.title_fingerprint,
        day_bucket: ctx.day_bucket,
        is_primary: incoming.is_primary,
        published_at: incoming.published_at,
    }
}

/// Map labels, clamp impact, and normalize sources.
///
/// Sources repeating an already-seen canonical URL are dropped. Exactly one
/// source ends up primary: the first one flagged upstream, else the first.
#[must_use]
pub fn prepare_event(incoming: IncomingEvent, owners: &OwnershipTable) -> RawEvent {
    let id = incoming.id.unwrap_or_else(Uuid::new_v4);
    let ctx = SourceContext::new(
        id,
        &incoming.title,
        incoming.snippet.as_deref(),
        incoming.occurred_at,
    );

    let mut seen = HashSet::new();
    let mut sources: Vec<Source> = incoming
        .sources
        .iter()
        .map(|s| build_source(s, &ctx, owners))
        .filter(|s| seen.insert(s.canonical_url.clone()))
        .collect();

    let primary = sources.iter().position(|s| s.is_primary).unwrap_or(0);
    for (idx, source) in sources.iter_mut().enumerate() {
        source.is_primary = idx == primary;
    }

    let verification = incoming
        .verification
        .as_deref()
        .map_or_else(VerificationLevel::default, VerificationLevel::from_label);

    RawEvent {
        id,
        brand_id: incoming.brand_id,
        category: Category::from_label(&incoming.category),
        title: incoming.title,
        snippet: incoming.snippet,
        occurred_at: incoming.occurred_at,
        impact: ImpactDeltas::new(incoming.impact),
        sources,
        verification,
    }
}
