//! Community outlook: crowd ratings shrunk toward a neutral prior.

use conductdb_core::{Category, PerCategory};
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceLevel;
use crate::error::ScoringError;

pub const PRIOR_MEAN: f64 = 3.0;
pub const PRIOR_STRENGTH: f64 = 20.0;
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// One user rating of one category, on a 1–5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub category: Category,
    pub value: i64,
}

impl Rating {
    /// # Errors
    ///
    /// Returns [`ScoringError::RatingOutOfRange`] unless `value` is in `1..=5`.
    pub fn new(category: Category, value: i64) -> Result<Self, ScoringError> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self { category, value })
        } else {
            Err(ScoringError::RatingOutOfRange(value))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityCategoryOutlook {
    pub category: Category,
    pub n: u64,
    pub mean: f64,
    /// Population standard deviation.
    pub sd: f64,
    /// Counts of ratings 1 through 5.
    pub histogram: [u64; 5],
    /// Shrunk display score on the 1–5 scale.
    pub score: f64,
    pub confidence: ConfidenceLevel,
}

/// `(m·n + 3·k) / (n + k)` with `k = 20`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn posterior(n: u64, mean: f64) -> f64 {
    let n = n as f64;
    let mean = if mean.is_finite() { mean } else { PRIOR_MEAN };
    (mean * n + PRIOR_MEAN * PRIOR_STRENGTH) / (n + PRIOR_STRENGTH)
}

#[must_use]
pub fn confidence_for(n: u64) -> ConfidenceLevel {
    match n {
        0..=9 => ConfidenceLevel::None,
        10..=29 => ConfidenceLevel::Low,
        30..=99 => ConfidenceLevel::Medium,
        _ => ConfidenceLevel::High,
    }
}

/// Outlook from pre-aggregated `(n, mean)`, for callers that only keep counts.
#[must_use]
pub fn from_summary(category: Category, n: u64, mean: f64) -> CommunityCategoryOutlook {
    CommunityCategoryOutlook {
        category,
        n,
        mean: if n == 0 { 0.0 } else { mean },
        sd: 0.0,
        histogram: [0; 5],
        score: posterior(n, mean),
        confidence: confidence_for(n),
    }
}

/// Aggregate raw ratings into one outlook per category, in
/// [`Category::ALL`] order. Out-of-range ratings are skipped.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn aggregate(ratings: &[Rating]) -> Vec<CommunityCategoryOutlook> {
    let mut buckets: PerCategory<Vec<i64>> = PerCategory::default();
    let mut skipped = 0usize;
    for rating in ratings {
        if (MIN_RATING..=MAX_RATING).contains(&rating.value) {
            buckets.get_mut(rating.category).push(rating.value);
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "ignored out-of-range community ratings");
    }

    Category::ALL
        .iter()
        .map(|&category| {
            let values = buckets.get(category);
            let n = values.len() as u64;
            if n == 0 {
                return from_summary(category, 0, 0.0);
            }
            let count = values.len() as f64;
            let mean = values.iter().sum::<i64>() as f64 / count;
            let variance = values
                .iter()
                .map(|&v| (v as f64 - mean).powi(2))
                .sum::<f64>()
                / count;
            let mut histogram = [0u64; 5];
            for &v in values {
                histogram[(v - MIN_RATING) as usize] += 1;
            }
            CommunityCategoryOutlook {
                category,
                n,
                mean,
                sd: variance.sqrt(),
                histogram,
                score: posterior(n, mean),
                confidence: confidence_for(n),
            }
        })
        .collect()
}
