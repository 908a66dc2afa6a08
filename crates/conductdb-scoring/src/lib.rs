//! Trust-weighted scoring: category impact ledgers, confidence gating,
//! personalized composition, and community outlook.

pub mod confidence;
pub mod error;
pub mod impact;
pub mod outlook;
pub mod personalize;
pub mod recompute;

pub use confidence::{estimate, estimate_counts, Confidence, ConfidenceLevel, ScoreVisibility};
pub use error::ScoringError;
pub use impact::{
    effective_delta, verification_factor, AppliedChange, BrandScoreLedger, CategoryScore,
    BASELINE_SCORE,
};
pub use outlook::{aggregate, from_summary, CommunityCategoryOutlook, Rating};
pub use personalize::{
    compose, DealbreakerFlag, DealbreakerPolicy, PersonalizedScoreResult, ScoreBasis, UserWeights,
};
pub use recompute::{recompute_brand, recompute_brands, BrandLocks};
