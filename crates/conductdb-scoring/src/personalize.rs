//! Compose category scores and a user's priorities into one result.

use conductdb_core::{AppConfig, Category, PerCategory, UserPreferences};
use serde::{Deserialize, Serialize};

use crate::impact::{CategoryScore, MAX_SCORE, MIN_SCORE};

pub const DEFAULT_DEALBREAKER_LABEL: &str = "dealbreaker";
pub const DEFAULT_DEALBREAKER_CAP: f64 = 25.0;

/// Whether the weights came from the user or the equal-weight fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBasis {
    Personalized,
    Baseline,
}

/// Normalized category weights; always sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UserWeights(PerCategory<f64>);

impl UserWeights {
    /// `0.25` per category.
    #[must_use]
    pub fn equal() -> Self {
        Self(PerCategory::uniform(1.0 / 4.0))
    }

    /// Normalize raw weights. Negative or non-finite entries count as zero;
    /// if nothing positive remains, fall back to [`Self::equal`].
    #[must_use]
    pub fn normalize(raw: &PerCategory<f64>) -> (Self, ScoreBasis) {
        let cleaned = raw.map(|_, w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 });
        let total: f64 = cleaned.iter().map(|(_, w)| *w).sum();
        if total > 0.0 && total.is_finite() {
            (Self(cleaned.map(|_, w| w / total)), ScoreBasis::Personalized)
        } else {
            (Self::equal(), ScoreBasis::Baseline)
        }
    }

    #[must_use]
    pub fn get(&self, category: Category) -> f64 {
        *self.0.get(category)
    }
}

/// How triggered dealbreakers affect the overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealbreakerPolicy {
    pub label: String,
    /// Overall score ceiling applied when any dealbreaker triggers.
    pub overall_cap: f64,
}

impl Default for DealbreakerPolicy {
    fn default() -> Self {
        Self {
            label: DEFAULT_DEALBREAKER_LABEL.to_string(),
            overall_cap: DEFAULT_DEALBREAKER_CAP,
        }
    }
}

impl DealbreakerPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            label: config.dealbreaker_label.clone(),
            overall_cap: config.dealbreaker_cap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealbreakerFlag {
    pub category: Category,
    pub threshold: f64,
    pub score: f64,
    pub label: String,
}

/// One category's part in a personalized result. `score` is `None` when the
/// category has no events; such categories carry no weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryContribution {
    pub category: Category,
    pub score: Option<f64>,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedScoreResult {
    /// `None` when no category has any events.
    pub overall: Option<f64>,
    pub breakdown: Vec<CategoryContribution>,
    pub dealbreakers: Vec<DealbreakerFlag>,
    pub basis: ScoreBasis,
    /// Overall before any dealbreaker cap.
    pub weighted_overall: Option<f64>,
    /// Categories left out for lack of evidence.
    pub withheld: Vec<Category>,
}

impl PersonalizedScoreResult {
    #[must_use]
    pub fn dealbreaker_triggered(&self) -> bool {
        !self.dealbreakers.is_empty()
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(MIN_SCORE, MAX_SCORE)
    } else {
        MIN_SCORE
    }
}

/// Compose a brand's category scores with the user's preferences, or equal
/// weights when the user has none.
///
/// Categories without events are withheld: they take no weight, and their
/// dealbreakers are not checked. The remaining weights are renormalized over
/// the scored categories. If the user weighted only withheld categories the
/// result falls back to equal weights over the scored ones.
#[must_use]
pub fn compose(
    scores: &PerCategory<CategoryScore>,
    preferences: Option<&UserPreferences>,
    policy: &DealbreakerPolicy,
) -> PersonalizedScoreResult {
    let (weights, mut basis) = match preferences {
        Some(prefs) => UserWeights::normalize(&prefs.weights),
        None => (UserWeights::equal(), ScoreBasis::Baseline),
    };

    let scored = |category: Category| scores.get(category).event_count > 0;
    let scored_count = Category::ALL.iter().filter(|&&c| scored(c)).count();
    let scored_weight: f64 = Category::ALL
        .iter()
        .filter(|&&c| scored(c))
        .map(|&c| weights.get(c))
        .sum();
    if scored_count > 0 && scored_weight <= 0.0 {
        basis = ScoreBasis::Baseline;
    }
    #[allow(clippy::cast_precision_loss)]
    let effective_weight = |category: Category| {
        if !scored(category) {
            0.0
        } else if scored_weight > 0.0 {
            weights.get(category) / scored_weight
        } else {
            1.0 / scored_count as f64
        }
    };

    let breakdown: Vec<CategoryContribution> = Category::ALL
        .iter()
        .map(|&category| {
            if !scored(category) {
                return CategoryContribution {
                    category,
                    score: None,
                    weight: 0.0,
                    contribution: 0.0,
                };
            }
            let score = clamp_score(scores.get(category).score);
            let weight = effective_weight(category);
            CategoryContribution {
                category,
                score: Some(score),
                weight,
                contribution: score * weight,
            }
        })
        .collect();
    let withheld: Vec<Category> = breakdown
        .iter()
        .filter(|c| c.score.is_none())
        .map(|c| c.category)
        .collect();
    let weighted_overall =
        (scored_count > 0).then(|| clamp_score(breakdown.iter().map(|c| c.contribution).sum()));

    let dealbreakers: Vec<DealbreakerFlag> = preferences
        .map(|p| p.dealbreakers.as_slice())
        .unwrap_or_default()
        .iter()
        .filter(|d| d.min_score.is_finite() && scored(d.category))
        .filter_map(|d| {
            let score = clamp_score(scores.get(d.category).score);
            (score < d.min_score).then(|| DealbreakerFlag {
                category: d.category,
                threshold: d.min_score,
                score,
                label: policy.label.clone(),
            })
        })
        .collect();

    let overall = weighted_overall.map(|w| {
        if dealbreakers.is_empty() {
            w
        } else {
            w.min(policy.overall_cap)
        }
    });

    PersonalizedScoreResult {
        overall,
        breakdown,
        dealbreakers,
        basis,
        weighted_overall,
        withheld,
    }
}
