//! Near-duplicate clustering of events within one brand/category window.
//!
//! Pure and synchronous: every call works on its own batch and keeps no
//! state between calls.

use std::collections::HashSet;

use conductdb_core::{AppConfig, RawEvent, Source};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::{normalize_tokens, source_name_from_url};

/// Similarity an event pair must strictly exceed to be clustered.
pub const DEFAULT_DEDUP_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupConfig {
    pub threshold: f64,
    /// Move duplicates' sources onto the canonical event.
    pub merge_sources: bool,
}

impl DedupConfig {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            threshold: config.dedup_threshold,
            merge_sources: true,
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DEDUP_THRESHOLD,
            merge_sources: false,
        }
    }
}

/// A duplicate report folded into a canonical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRef {
    pub event_id: Uuid,
    pub url: Option<String>,
    pub source_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCluster {
    pub canonical: RawEvent,
    pub duplicates: Vec<DuplicateRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DedupReport {
    pub input_count: usize,
    pub cluster_count: usize,
    pub duplicate_count: usize,
}

/// Similarity of two already-normalized titles. Empty titles never match.
fn normalized_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::sorensen_dice(a, b).clamp(0.0, 1.0)
}

/// Sørensen–Dice bigram similarity of two titles after normalization, in
/// `[0, 1]`. A title with no alphanumerics scores 0 against anything.
#[must_use]
pub fn title_similarity(a: &str, b: &str) -> f64 {
    normalized_similarity(&normalize_tokens(a), &normalize_tokens(b))
}

#[must_use]
pub fn is_duplicate(similarity: f64, threshold: f64) -> bool {
    similarity > threshold
}

/// Reference to `event` as a duplicate: its primary URL and a source name,
/// derived from the URL when the source carries none.
#[must_use]
pub fn duplicate_ref(event: &RawEvent) -> DuplicateRef {
    let url = event.primary_url().map(ToOwned::to_owned);
    let source_name = event
        .sources
        .iter()
        .find(|s| s.is_primary)
        .or_else(|| event.sources.first())
        .map(|s| s.name.trim())
        .filter(|n| !n.is_empty())
        .map_or_else(
            || url.as_deref().map_or_else(|| "unknown".to_string(), source_name_from_url),
            ToOwned::to_owned,
        );
    DuplicateRef {
        event_id: event.id,
        url,
        source_name,
    }
}

/// Attach `duplicate`'s sources to `canonical`, skipping canonical URLs it
/// already has.
pub fn merge_sources(canonical: &mut RawEvent, duplicate: &RawEvent) {
    let mut seen: HashSet<String> = canonical
        .sources
        .iter()
        .map(|s| s.canonical_url.clone())
        .collect();
    for source in &duplicate.sources {
        if seen.insert(source.canonical_url.clone()) {
            canonical.sources.push(Source {
                event_id: canonical.id,
                is_primary: false,
                ..source.clone()
            });
        }
    }
}

/// Cluster `events` by title similarity.
///
/// Each not-yet-clustered event, in input order, anchors a cluster and claims
/// every later unclustered event whose similarity to it exceeds the
/// threshold. Anchors are emitted in first-seen order.
#[must_use]
pub fn cluster_events(events: Vec<RawEvent>, config: &DedupConfig) -> (Vec<EventCluster>, DedupReport) {
    let mut report = DedupReport {
        input_count: events.len(),
        ..DedupReport::default()
    };
    if events.is_empty() {
        return (Vec::new(), report);
    }

    let normalized: Vec<String> = events.iter().map(|e| normalize_tokens(&e.title)).collect();
    let mut claimed = vec![false; events.len()];
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();

    for anchor in 0..events.len() {
        if claimed[anchor] {
            continue;
        }
        claimed[anchor] = true;
        let mut members = Vec::new();
        for other in (anchor + 1)..events.len() {
            if claimed[other] {
                continue;
            }
            let similarity = normalized_similarity(&normalized[anchor], &normalized[other]);
            if is_duplicate(similarity, config.threshold) {
                claimed[other] = true;
                members.push(other);
            }
        }
        groups.push((anchor, members));
    }

    let mut slots: Vec<Option<RawEvent>> = events.into_iter().map(Some).collect();
    let mut clusters = Vec::with_capacity(groups.len());
    for (anchor, members) in groups {
        let Some(mut canonical) = slots[anchor].take() else {
            continue;
        };
        let mut duplicates = Vec::with_capacity(members.len());
        for idx in members {
            let Some(dup) = slots[idx].take() else {
                continue;
            };
            duplicates.push(duplicate_ref(&dup));
            if config.merge_sources {
                merge_sources(&mut canonical, &dup);
            }
        }
        report.duplicate_count += duplicates.len();
        clusters.push(EventCluster {
            canonical,
            duplicates,
        });
    }
    report.cluster_count = clusters.len();

    tracing::debug!(
        input = report.input_count,
        clusters = report.cluster_count,
        duplicates = report.duplicate_count,
        "dedup pass complete"
    );
    (clusters, report)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use conductdb_core::{Category, ImpactDeltas, LinkKind, OwnerKind, VerificationLevel};

    use super::*;

    fn event(title: &str, url: &str, name: &str) -> RawEvent {
        let id = Uuid::new_v4();
        RawEvent {
            id,
            brand_id: Uuid::nil(),
            category: Category::Labor,
            title: title.to_string(),
            snippet: None,
            occurred_at: Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(),
            impact: ImpactDeltas::single(Category::Labor, -5.0),
            sources: vec![Source {
                id: Uuid::new_v4(),
                event_id: id,
                name: name.to_string(),
                raw_url: url.to_string(),
                canonical_url: url.to_string(),
                domain: None,
                owner: String::new(),
                owner_kind: OwnerKind::Publisher,
                title_fingerprint: 0,
                day_bucket: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                is_primary: true,
                link_kind: LinkKind::Article,
                published_at: None,
            }],
            verification: VerificationLevel::Unverified,
        }
    }

    #[test]
    fn threshold_is_strict() {
        assert!(!is_duplicate(0.75, DEFAULT_DEDUP_THRESHOLD));
        assert!(is_duplicate(0.76, DEFAULT_DEDUP_THRESHOLD));
    }

    #[test]
    fn clustering_threshold_is_strict() {
        let config = DedupConfig::default();

        assert_eq!(title_similarity("Acme fined", "Acme finds"), 0.75);
        let (clusters, _) = cluster_events(
            vec![
                event("Acme fined", "https://www.reuters.com/a", "Reuters"),
                event("Acme finds", "https://apnews.com/b", "AP"),
            ],
            &config,
        );
        assert_eq!(clusters.len(), 2);

        assert!(title_similarity("Acme fined again", "Acme finds again") > 0.76);
        let (clusters, report) = cluster_events(
            vec![
                event("Acme fined again", "https://www.reuters.com/a", "Reuters"),
                event("Acme finds again", "https://apnews.com/b", "AP"),
            ],
            &config,
        );
        assert_eq!(clusters.len(), 1);
        assert_eq!(report.duplicate_count, 1);
    }

    #[test]
    fn empty_titles_never_match() {
        assert_eq!(title_similarity("", ""), 0.0);
        assert_eq!(title_similarity("!!!", "Acme fined"), 0.0);
        let (clusters, _) = cluster_events(
            vec![
                event("", "https://www.reuters.com/a", "Reuters"),
                event("", "https://apnews.com/b", "AP"),
            ],
            &DedupConfig::default(),
        );
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn similarity_ignores_case_and_punctuation() {
        let s = title_similarity("Acme fined for wage theft!", "ACME fined for wage-theft");
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_titles_score_low() {
        assert!(title_similarity("Acme fined for wage theft", "River cleanup funded by Globex") < 0.5);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let (clusters, report) = cluster_events(Vec::new(), &DedupConfig::default());
        assert!(clusters.is_empty());
        assert_eq!(report, DedupReport::default());
    }

    #[test]
    fn singleton_has_no_duplicates() {
        let (clusters, _) = cluster_events(
            vec![event("Acme fined", "https://a.com/x", "A")],
            &DedupConfig::default(),
        );
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].duplicates.is_empty());
    }

    #[test]
    fn anchors_keep_first_seen_order() {
        let events = vec![
            event("Acme fined for wage theft", "https://a.com/1", "A"),
            event("Globex spill fouls river", "https://b.com/1", "B"),
            event("Acme fined for wage theft.", "https://c.com/1", "C"),
        ];
        let first = events[0].id;
        let second = events[1].id;
        let (clusters, report) = cluster_events(events, &DedupConfig::default());
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].canonical.id, first);
        assert_eq!(clusters[1].canonical.id, second);
        assert_eq!(clusters[0].duplicates.len(), 1);
        assert_eq!(clusters[0].duplicates[0].source_name, "C");
        assert_eq!(report.duplicate_count, 1);
    }

    #[test]
    fn duplicate_without_name_derives_one_from_url() {
        let events = vec![
            event("Acme fined", "https://a.com/1", "A"),
            event("Acme fined", "https://www.nytimes.com/acme", "  "),
        ];
        let (clusters, _) = cluster_events(events, &DedupConfig::default());
        assert_eq!(clusters[0].duplicates[0].source_name, "nytimes");
        assert_eq!(
            clusters[0].duplicates[0].url.as_deref(),
            Some("https://www.nytimes.com/acme")
        );
    }

    #[test]
    fn merge_moves_new_sources_only() {
        let mut dup_same_url = event("Acme fined", "https://a.com/1", "A2");
        dup_same_url.sources[0].canonical_url = "https://a.com/1".to_string();
        let events = vec![
            event("Acme fined", "https://a.com/1", "A"),
            event("Acme fined", "https://b.com/1", "B"),
            dup_same_url,
        ];
        let canonical_id = events[0].id;
        let config = DedupConfig {
            merge_sources: true,
            ..DedupConfig::default()
        };
        let (clusters, _) = cluster_events(events, &config);
        let canonical = &clusters[0].canonical;
        assert_eq!(canonical.sources.len(), 2);
        assert!(canonical.sources.iter().all(|s| s.event_id == canonical_id));
        assert_eq!(canonical.sources.iter().filter(|s| s.is_primary).count(), 1);
    }
}
