use serde::{Deserialize, Serialize};

use crate::category::{Category, PerCategory};

/// A user-configured hard floor on one category score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dealbreaker {
    pub category: Category,
    /// Scores strictly below this value trigger the dealbreaker.
    pub min_score: f64,
}

/// A user's stated priorities, as supplied by the preferences store.
///
/// `weights` are raw and need not sum to one; normalization happens when a
/// personalized score is composed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub weights: PerCategory<f64>,
    #[serde(default)]
    pub dealbreakers: Vec<Dealbreaker>,
}
