use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::{Category, PerCategory};
use crate::verification::VerificationLevel;

/// Largest magnitude a single event may declare (or apply) per category.
pub const MAX_EVENT_IMPACT: f64 = 20.0;

/// How a source link should be read: a reporting article, a registry or
/// database record, or an outlet homepage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    #[default]
    Article,
    Database,
    Homepage,
}

/// Kind of organisation controlling a publishing domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    #[default]
    Publisher,
    Wire,
    Government,
    Court,
    Ngo,
    Database,
}

impl std::fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OwnerKind::Publisher => "publisher",
            OwnerKind::Wire => "wire",
            OwnerKind::Government => "government",
            OwnerKind::Court => "court",
            OwnerKind::Ngo => "ngo",
            OwnerKind::Database => "database",
        };
        f.write_str(s)
    }
}

/// Declared per-category impact of an event, each slot clamped to
/// `[-MAX_EVENT_IMPACT, MAX_EVENT_IMPACT]` at construction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "PerCategory<f64>", into = "PerCategory<f64>")]
pub struct ImpactDeltas(PerCategory<f64>);

impl ImpactDeltas {
    /// Clamp raw declared deltas. Non-finite values become `0.0`.
    #[must_use]
    pub fn new(raw: PerCategory<f64>) -> Self {
        Self(raw.map(|_, v| {
            if v.is_finite() {
                v.clamp(-MAX_EVENT_IMPACT, MAX_EVENT_IMPACT)
            } else {
                0.0
            }
        }))
    }

    /// A delta on a single category, zero elsewhere.
    #[must_use]
    pub fn single(category: Category, delta: f64) -> Self {
        let mut raw = PerCategory::<f64>::default();
        *raw.get_mut(category) = delta;
        Self::new(raw)
    }

    #[must_use]
    pub fn get(&self, category: Category) -> f64 {
        *self.0.get(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.0.iter().map(|(c, v)| (c, *v))
    }
}

impl From<PerCategory<f64>> for ImpactDeltas {
    fn from(raw: PerCategory<f64>) -> Self {
        Self::new(raw)
    }
}

impl From<ImpactDeltas> for PerCategory<f64> {
    fn from(d: ImpactDeltas) -> Self {
        d.0
    }
}

/// A single piece of evidence attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Publisher name as supplied by ingestion; the credibility lookup key.
    pub name: String,
    pub raw_url: String,
    pub canonical_url: String,
    /// Public-suffix-aware registrable domain, `None` if the URL did not parse.
    pub domain: Option<String>,
    pub owner: String,
    pub owner_kind: OwnerKind,
    pub title_fingerprint: u64,
    pub day_bucket: NaiveDate,
    pub is_primary: bool,
    pub link_kind: LinkKind,
    pub published_at: Option<DateTime<Utc>>,
}

/// A third-party report about a brand's conduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub category: Category,
    pub title: String,
    pub snippet: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub impact: ImpactDeltas,
    pub sources: Vec<Source>,
    #[serde(default)]
    pub verification: VerificationLevel,
}

impl RawEvent {
    /// URL of the primary source, falling back to the first attached source.
    #[must_use]
    pub fn primary_url(&self) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.is_primary)
            .or_else(|| self.sources.first())
            .map(|s| s.canonical_url.as_str())
    }

    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

/// A source as delivered by an ingestion feed, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingSource {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_primary: bool,
}

/// An event as delivered by an ingestion feed.
///
/// `category` and `verification` are loosely-typed upstream labels and are
/// mapped through [`Category::from_label`] and
/// [`VerificationLevel::from_label`] when the event is prepared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingEvent {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub brand_id: Uuid,
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub snippet: Option<String>,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub impact: PerCategory<f64>,
    #[serde(default)]
    pub sources: Vec<IncomingSource>,
    #[serde(default)]
    pub verification: Option<String>,
}
