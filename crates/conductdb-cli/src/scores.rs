//! Scoring command handlers for the CLI.
//!
//! `score brands` replays a batch of incoming events through dedup,
//! verification and the impact ledger, then prints each brand's gated
//! category scores. The other subcommands expose the confidence and
//! community-outlook calculations on their own.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Subcommand;
use conductdb_core::{BrandId, Category, IncomingEvent, JobSummary, RawEvent, UserPreferences};
use conductdb_scoring::{
    aggregate, compose, estimate_counts, recompute_brands, BrandLocks, CommunityCategoryOutlook,
    Confidence, PersonalizedScoreResult, Rating, ScoreVisibility,
};
use serde::Serialize;

use crate::context::{print_json, read_json, RunContext};
use crate::evidence::{cluster_by_brand, prepare_all};

/// Sub-commands available under `score`.
#[derive(Debug, Subcommand)]
pub enum ScoreCommands {
    /// Score every brand found in a batch of incoming events
    Brands {
        /// JSON file holding an array of incoming events
        #[arg(long)]
        input: PathBuf,
        /// JSON file holding user preferences for a personalized score
        #[arg(long)]
        prefs: Option<PathBuf>,
    },
    /// Aggregate community ratings into per-category outlooks
    Outlook {
        /// JSON file holding an array of ratings
        #[arg(long)]
        input: PathBuf,
    },
    /// Estimate confidence for a category from raw counts
    Confidence {
        /// Number of events applied to the category
        #[arg(long)]
        events: usize,
        /// How many of those events are corroborated or official
        #[arg(long)]
        verified: usize,
        /// Independent owners behind the sources
        #[arg(long)]
        owners: usize,
        /// Score to gate against the estimated confidence
        #[arg(long)]
        score: Option<f64>,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryOutput {
    pub category: Category,
    #[serde(flatten)]
    pub visibility: ScoreVisibility,
    pub event_count: usize,
    pub verified_count: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct BrandOutput {
    pub brand_id: BrandId,
    pub categories: Vec<CategoryOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalized: Option<PersonalizedScoreResult>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreOutput {
    pub summary: JobSummary,
    pub brands: Vec<BrandOutput>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConfidenceOutput {
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<ScoreVisibility>,
}

pub(crate) async fn run(ctx: &RunContext, command: ScoreCommands) -> anyhow::Result<()> {
    match command {
        ScoreCommands::Brands { input, prefs } => {
            let incoming: Vec<IncomingEvent> = read_json(&input)?;
            let prefs: Option<UserPreferences> = prefs.map(|p| read_json(&p)).transpose()?;
            let output = run_brands(ctx, incoming, prefs.as_ref()).await;
            print_json(&output)
        }
        ScoreCommands::Outlook { input } => {
            let ratings: Vec<Rating> = read_json(&input)?;
            print_json(&run_outlook(&ratings))
        }
        ScoreCommands::Confidence {
            events,
            verified,
            owners,
            score,
        } => print_json(&run_confidence(events, verified, owners, score)),
    }
}

pub(crate) async fn run_brands(
    ctx: &RunContext,
    incoming: Vec<IncomingEvent>,
    prefs: Option<&UserPreferences>,
) -> ScoreOutput {
    let deduped = cluster_by_brand(prepare_all(incoming, &ctx.ownership), &ctx.dedup);
    let mut events: Vec<RawEvent> = deduped.clusters.into_iter().map(|c| c.canonical).collect();
    ctx.verifier.verify_batch(&mut events);

    let mut batches: BTreeMap<BrandId, Vec<RawEvent>> = BTreeMap::new();
    for event in events {
        batches.entry(event.brand_id).or_default().push(event);
    }
    let brand_ids: Vec<BrandId> = batches.keys().copied().collect();

    let locks = BrandLocks::new();
    let summary = recompute_brands(
        &locks,
        batches.into_iter().collect(),
        ctx.max_concurrent_brands,
    )
    .await;

    let mut brands = Vec::with_capacity(brand_ids.len());
    for brand_id in brand_ids {
        let Some(ledger) = locks.snapshot(brand_id).await else {
            continue;
        };
        let categories = Category::ALL
            .iter()
            .map(|&category| {
                let score = ledger.score(category);
                CategoryOutput {
                    category,
                    visibility: ScoreVisibility::for_score(score),
                    event_count: score.event_count,
                    verified_count: score.verified_count,
                }
            })
            .collect();
        let personalized = prefs.map(|p| compose(ledger.scores(), Some(p), &ctx.dealbreakers));
        brands.push(BrandOutput {
            brand_id,
            categories,
            personalized,
        });
    }

    ScoreOutput { summary, brands }
}

pub(crate) fn run_outlook(ratings: &[Rating]) -> Vec<CommunityCategoryOutlook> {
    aggregate(ratings)
}

pub(crate) fn run_confidence(
    events: usize,
    verified: usize,
    owners: usize,
    score: Option<f64>,
) -> ConfidenceOutput {
    let confidence = estimate_counts(events, verified, owners);
    ConfidenceOutput {
        visibility: score.map(|s| ScoreVisibility::gate(s, confidence)),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::context::test_context;
    use conductdb_scoring::ConfidenceLevel;

    fn events_for(brand: Uuid) -> Vec<IncomingEvent> {
        serde_json::from_value(json!([
            {
                "brand_id": brand,
                "category": "labour",
                "title": "OSHA cites Acme warehouse",
                "occurred_at": "2026-02-01T00:00:00Z",
                "impact": { "labor": -10.0 },
                "sources": [{ "url": "https://www.osha.gov/news/acme", "name": "OSHA" }]
            }
        ]))
        .expect("valid events")
    }

    #[tokio::test]
    async fn official_event_moves_labor_score() {
        let ctx = test_context();
        let brand = Uuid::new_v4();

        let output = run_brands(&ctx, events_for(brand), None).await;
        assert_eq!(output.summary.failed, 0);
        assert_eq!(output.brands.len(), 1);

        let labor = &output.brands[0].categories[0];
        assert_eq!(labor.category, Category::Labor);
        assert_eq!(labor.verified_count, 1);
        match &labor.visibility {
            ScoreVisibility::Visible { score, .. } => assert_eq!(*score, 40.0),
            ScoreVisibility::Withheld { .. } => panic!("labor score should be visible"),
        }
        assert!(!output.brands[0].categories[1].visibility.is_visible());
        assert!(output.brands[0].personalized.is_none());
    }

    #[tokio::test]
    async fn preferences_add_personalized_score() {
        let ctx = test_context();
        let brand = Uuid::new_v4();
        let prefs: UserPreferences = serde_json::from_value(json!({
            "weights": { "labor": 1.0 },
            "dealbreakers": [{ "category": "labor", "min_score": 45.0 }]
        }))
        .expect("valid preferences");

        let output = run_brands(&ctx, events_for(brand), Some(&prefs)).await;
        let personalized = output.brands[0]
            .personalized
            .as_ref()
            .expect("personalized score");
        assert!(personalized.dealbreaker_triggered());
        assert_eq!(personalized.weighted_overall, Some(40.0));
        assert_eq!(personalized.overall, Some(25.0));
    }

    #[tokio::test]
    async fn empty_input_scores_nothing() {
        let output = run_brands(&test_context(), Vec::new(), None).await;
        assert_eq!(output.summary.processed, 0);
        assert!(output.brands.is_empty());
    }

    #[test]
    fn outlook_shrinks_toward_neutral() {
        let ratings = vec![Rating::new(Category::Social, 5).expect("in range")];
        let outlook = run_outlook(&ratings);
        let social = outlook
            .iter()
            .find(|o| o.category == Category::Social)
            .expect("social outlook");
        assert_eq!(social.n, 1);
        assert!(social.score > 3.0 && social.score < 3.2);
    }

    #[test]
    fn zero_events_withholds_score() {
        let output = run_confidence(0, 0, 0, Some(72.0));
        assert_eq!(output.confidence.level, ConfidenceLevel::None);
        assert!(matches!(
            output.visibility,
            Some(ScoreVisibility::Withheld { .. })
        ));
    }
}
