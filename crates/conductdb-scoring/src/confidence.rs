//! Confidence signal used to gate score display.

use serde::{Deserialize, Serialize};

use crate::impact::CategoryScore;

const VOLUME_WEIGHT: f64 = 0.60;
const VERIFIED_WEIGHT: f64 = 0.25;
const DIVERSITY_WEIGHT: f64 = 0.15;
/// `ln(1 + n)` saturates at `n = 20` events.
const VOLUME_SATURATION: f64 = 21.0;
const OWNER_SATURATION: f64 = 3.0;

const LOW_BELOW: f64 = 0.35;
const MEDIUM_BELOW: f64 = 0.70;

/// Status reported instead of a score when there is no evidence.
pub const MONITORING_STATUS: &str = "monitoring_in_progress";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    None,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConfidenceLevel::None => "none",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    /// In `[0, 1]`.
    pub weight: f64,
    pub level: ConfidenceLevel,
}

/// Confidence weight from event volume, verified share, and owner diversity.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn confidence_weight(event_count: usize, verified_rate: f64, independent_owner_count: usize) -> f64 {
    let volume = (event_count as f64).ln_1p() / VOLUME_SATURATION.ln();
    let verified = if event_count == 0 || !verified_rate.is_finite() {
        0.0
    } else {
        verified_rate.clamp(0.0, 1.0)
    };
    let diversity = (independent_owner_count as f64 / OWNER_SATURATION).min(1.0);
    (VOLUME_WEIGHT * volume + VERIFIED_WEIGHT * verified + DIVERSITY_WEIGHT * diversity).clamp(0.0, 1.0)
}

#[must_use]
pub fn level_for(event_count: usize, weight: f64) -> ConfidenceLevel {
    if event_count == 0 {
        ConfidenceLevel::None
    } else if weight < LOW_BELOW {
        ConfidenceLevel::Low
    } else if weight < MEDIUM_BELOW {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::High
    }
}

/// Confidence from a verified share.
#[must_use]
pub fn estimate(event_count: usize, verified_rate: f64, independent_owner_count: usize) -> Confidence {
    let weight = confidence_weight(event_count, verified_rate, independent_owner_count);
    Confidence {
        weight,
        level: level_for(event_count, weight),
    }
}

/// Confidence from raw counts; `verified_rate` is `0` when there are no events.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate_counts(event_count: usize, verified_count: usize, independent_owner_count: usize) -> Confidence {
    let rate = if event_count == 0 {
        0.0
    } else {
        verified_count as f64 / event_count as f64
    };
    estimate(event_count, rate, independent_owner_count)
}

#[must_use]
pub fn estimate_score(score: &CategoryScore) -> Confidence {
    estimate_counts(
        score.event_count,
        score.verified_count,
        score.independent_owner_count,
    )
}

/// What a caller may show for one category score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum ScoreVisibility {
    Visible { score: f64, confidence: Confidence },
    Withheld { status: String },
}

impl ScoreVisibility {
    /// Withhold the score entirely when confidence is `none`.
    #[must_use]
    pub fn gate(score: f64, confidence: Confidence) -> Self {
        if confidence.level == ConfidenceLevel::None {
            ScoreVisibility::Withheld {
                status: MONITORING_STATUS.to_string(),
            }
        } else {
            ScoreVisibility::Visible { score, confidence }
        }
    }

    #[must_use]
    pub fn for_score(score: &CategoryScore) -> Self {
        Self::gate(score.score, estimate_score(score))
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(self, ScoreVisibility::Visible { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_events_means_no_confidence() {
        let c = estimate_counts(0, 0, 0);
        assert_eq!(c.level, ConfidenceLevel::None);
        assert_eq!(c.weight, 0.0);
    }

    #[test]
    fn zero_events_withholds_rather_than_showing_baseline() {
        let visibility = ScoreVisibility::for_score(&CategoryScore::default());
        assert_eq!(
            visibility,
            ScoreVisibility::Withheld {
                status: MONITORING_STATUS.to_string()
            }
        );
        assert!(!visibility.is_visible());
    }

    #[test]
    fn more_events_never_lower_confidence() {
        let ten = estimate(10, 0.5, 3);
        let three = estimate(3, 0.5, 3);
        assert!(ten.weight >= three.weight);
        let mut last = 0.0;
        for n in 1..60 {
            let w = estimate(n, 0.5, 3).weight;
            assert!(w >= last);
            last = w;
        }
    }

    #[test]
    fn weight_formula_matches_components() {
        // 20 events saturate volume; all verified; 3 owners saturate diversity.
        let c = estimate(20, 1.0, 3);
        assert!((c.weight - 1.0).abs() < 1e-9);
        assert_eq!(c.level, ConfidenceLevel::High);

        // 1 event, unverified, 1 owner: 0.6·ln2/ln21 + 0.15/3
        let expected = 0.6 * 2f64.ln() / 21f64.ln() + 0.05;
        let c = estimate_counts(1, 0, 1);
        assert!((c.weight - expected).abs() < 1e-9);
        assert_eq!(c.level, ConfidenceLevel::Low);
    }

    #[test]
    fn levels_follow_thresholds() {
        assert_eq!(level_for(5, 0.0), ConfidenceLevel::Low);
        assert_eq!(level_for(5, 0.349), ConfidenceLevel::Low);
        assert_eq!(level_for(5, 0.35), ConfidenceLevel::Medium);
        assert_eq!(level_for(5, 0.699), ConfidenceLevel::Medium);
        assert_eq!(level_for(5, 0.70), ConfidenceLevel::High);
    }

    #[test]
    fn weight_is_clamped() {
        let c = estimate(10_000, 5.0, 100);
        assert!(c.weight <= 1.0);
        let c = estimate(3, f64::NAN, 0);
        assert!(c.weight >= 0.0);
    }

    #[test]
    fn visible_score_carries_confidence() {
        let score = CategoryScore {
            score: 41.5,
            event_count: 4,
            verified_count: 2,
            independent_owner_count: 2,
        };
        match ScoreVisibility::for_score(&score) {
            ScoreVisibility::Visible { score, confidence } => {
                assert_eq!(score, 41.5);
                assert_eq!(confidence.level, ConfidenceLevel::Medium);
            }
            ScoreVisibility::Withheld { .. } => panic!("expected a visible score"),
        }
    }
}
