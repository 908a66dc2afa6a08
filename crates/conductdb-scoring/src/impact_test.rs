use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use conductdb_core::{ImpactDeltas, LinkKind, OwnerKind, Source};

use super::*;

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, day, 8, 0, 0).unwrap()
}

fn source(domain: &str, owner: &str) -> Source {
    Source {
        id: Uuid::new_v4(),
        event_id: Uuid::nil(),
        name: owner.to_string(),
        raw_url: format!("https://{domain}/story"),
        canonical_url: format!("https://{domain}/story"),
        domain: Some(domain.to_string()),
        owner: owner.to_string(),
        owner_kind: OwnerKind::Publisher,
        title_fingerprint: 0,
        day_bucket: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        is_primary: false,
        link_kind: LinkKind::Article,
        published_at: None,
    }
}

fn labor_event(brand: Uuid, impact: f64, level: VerificationLevel, sources: usize) -> RawEvent {
    RawEvent {
        id: Uuid::new_v4(),
        brand_id: brand,
        category: Category::Labor,
        title: "Acme labor report".to_string(),
        snippet: None,
        occurred_at: at(1),
        impact: ImpactDeltas::single(Category::Labor, impact),
        sources: (0..sources)
            .map(|i| source(&format!("outlet{i}.com"), &format!("Owner {i}")))
            .collect(),
        verification: level,
    }
}

fn labor(ledger: &BrandScoreLedger) -> f64 {
    ledger.score(Category::Labor).score
}

// -----------------------------------------------------------------------
// factors and deltas
// -----------------------------------------------------------------------

#[test]
fn factor_table() {
    assert_eq!(verification_factor(VerificationLevel::Official, 1), 1.0);
    assert_eq!(verification_factor(VerificationLevel::Corroborated, 1), 0.75);
    assert_eq!(verification_factor(VerificationLevel::Unverified, 0), 0.0);
    assert_eq!(verification_factor(VerificationLevel::Unverified, 1), 0.0);
    assert_eq!(verification_factor(VerificationLevel::Unverified, 2), 0.25);
    assert_eq!(verification_factor(VerificationLevel::Unverified, 7), 0.25);
}

#[test]
fn effective_delta_is_capped() {
    assert_eq!(effective_delta(-500.0, 1.0), -20.0);
    assert_eq!(effective_delta(45.0, 0.75), 20.0);
    assert_eq!(effective_delta(f64::NAN, 1.0), 0.0);
    assert!((effective_delta(-10.0, 0.75) + 7.5).abs() < 1e-9);
}

#[test]
fn apply_delta_clamps_to_bounds() {
    assert_eq!(apply_delta(95.0, 20.0), 100.0);
    assert_eq!(apply_delta(5.0, -20.0), 0.0);
    assert_eq!(apply_delta(50.0, -7.5), 42.5);
}

// -----------------------------------------------------------------------
// ledger
// -----------------------------------------------------------------------

#[test]
fn single_unverified_source_leaves_score_unchanged() {
    let brand = Uuid::new_v4();
    let mut ledger = BrandScoreLedger::new(brand);
    let change = ledger
        .apply(&labor_event(brand, -10.0, VerificationLevel::Unverified, 1))
        .unwrap();
    assert!(change.is_noop());
    assert_eq!(labor(&ledger), BASELINE_SCORE);
    assert_eq!(ledger.score(Category::Labor).event_count, 1);
}

#[test]
fn corroboration_applies_the_weighted_delta() {
    let brand = Uuid::new_v4();
    let mut ledger = BrandScoreLedger::new(brand);
    let mut event = labor_event(brand, -10.0, VerificationLevel::Unverified, 1);
    ledger.apply(&event).unwrap();

    event.verification = VerificationLevel::Corroborated;
    let change = ledger.apply(&event).unwrap();

    assert!((change.deltas.labor + 7.5).abs() < 1e-9);
    assert!((labor(&ledger) - 42.5).abs() < 1e-9);
    assert_eq!(ledger.score(Category::Labor).event_count, 1);
    assert_eq!(ledger.score(Category::Labor).verified_count, 1);
}

#[test]
fn upgrade_to_official_applies_only_the_remainder() {
    let brand = Uuid::new_v4();
    let mut ledger = BrandScoreLedger::new(brand);
    let mut event = labor_event(brand, -10.0, VerificationLevel::Corroborated, 2);
    ledger.apply(&event).unwrap();
    event.verification = VerificationLevel::Official;
    let change = ledger.apply(&event).unwrap();

    assert!((change.deltas.labor + 2.5).abs() < 1e-9);
    assert!((labor(&ledger) - 40.0).abs() < 1e-9);
    assert_eq!(ledger.score(Category::Labor).verified_count, 1);
}

#[test]
fn reapplying_unchanged_event_is_noop() {
    let brand = Uuid::new_v4();
    let mut ledger = BrandScoreLedger::new(brand);
    let event = labor_event(brand, 12.0, VerificationLevel::Official, 1);
    ledger.apply(&event).unwrap();
    let after_first = ledger.scores().clone();

    let change = ledger.apply(&event).unwrap();

    assert!(change.is_noop());
    assert_eq!(ledger.scores(), &after_first);
}

#[test]
fn oversized_impact_moves_at_most_twenty() {
    let brand = Uuid::new_v4();
    let mut ledger = BrandScoreLedger::new(brand);
    let mut event = labor_event(brand, -500.0, VerificationLevel::Unverified, 2);
    for level in [
        VerificationLevel::Unverified,
        VerificationLevel::Corroborated,
        VerificationLevel::Official,
    ] {
        event.verification = level;
        ledger.apply(&event).unwrap();
        assert!(BASELINE_SCORE - labor(&ledger) <= MAX_EVENT_IMPACT + 1e-9);
    }
    assert!((labor(&ledger) - 30.0).abs() < 1e-9);
}

#[test]
fn scores_stay_within_bounds() {
    let brand = Uuid::new_v4();
    let mut ledger = BrandScoreLedger::new(brand);
    for i in 0..10 {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        for _ in 0..6 {
            ledger
                .apply(&labor_event(brand, sign * 20.0, VerificationLevel::Official, 1))
                .unwrap();
            for (_, s) in ledger.scores().iter() {
                assert!((MIN_SCORE..=MAX_SCORE).contains(&s.score));
            }
        }
    }
}

#[test]
fn independent_owners_are_counted_per_category() {
    let brand = Uuid::new_v4();
    let mut ledger = BrandScoreLedger::new(brand);
    ledger
        .apply(&labor_event(brand, -5.0, VerificationLevel::Unverified, 2))
        .unwrap();
    ledger
        .apply(&labor_event(brand, -5.0, VerificationLevel::Unverified, 3))
        .unwrap();
    assert_eq!(ledger.score(Category::Labor).independent_owner_count, 3);
    assert_eq!(ledger.score(Category::Politics).independent_owner_count, 0);
}

#[test]
fn foreign_brand_event_is_rejected() {
    let mut ledger = BrandScoreLedger::new(Uuid::new_v4());
    let event = labor_event(Uuid::new_v4(), -5.0, VerificationLevel::Official, 1);
    assert!(matches!(
        ledger.apply(&event),
        Err(ScoringError::BrandMismatch { .. })
    ));
    assert_eq!(labor(&ledger), BASELINE_SCORE);
    assert!(ledger.applied_factor(event.id).is_none());
}

#[test]
fn chronological_application_sorts_by_occurrence() {
    let brand = Uuid::new_v4();
    let mut older = labor_event(brand, 20.0, VerificationLevel::Official, 1);
    older.occurred_at = at(1);
    let mut newer = labor_event(brand, 20.0, VerificationLevel::Official, 1);
    newer.occurred_at = at(1) + Duration::days(3);
    let mut stranger = labor_event(Uuid::new_v4(), 20.0, VerificationLevel::Official, 1);
    stranger.occurred_at = at(2);

    let mut ledger = BrandScoreLedger::new(brand);
    let (changes, failures) = ledger.apply_chronological([&newer, &stranger, &older]);

    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].event_id, older.id);
    assert_eq!(changes[1].event_id, newer.id);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, stranger.id);
    assert_eq!(labor(&ledger), 90.0);
}
