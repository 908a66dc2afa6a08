//! Verification state machine.
//!
//! Levels only move forward: `unverified → corroborated → official`, or
//! straight from `unverified` to `official`. Two paths reach `corroborated`:
//!
//! - [`Verifier::verify_event`] looks at one event's own sources and weighs
//!   them by credibility and independent ownership.
//! - [`Verifier::sweep`] groups recent unverified events by
//!   `(brand, category, day, fingerprint)` and upgrades whole groups that
//!   span two or more registrable domains, ignoring credibility.
//!
//! Both paths are idempotent on already-upgraded events.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use conductdb_core::{
    AppConfig, Category, ItemFailure, JobSummary, RawEvent, Source, VerificationLevel,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credibility::CredibilityStore;
use crate::error::EvidenceError;
use crate::normalize::{day_bucket, host_of, text_fingerprint};
use crate::ownership::owner_key;

pub const DEFAULT_CORROBORATION_THRESHOLD: f64 = 0.80;
pub const DEFAULT_FALLBACK_THRESHOLD: f64 = 0.60;
pub const DEFAULT_SWEEP_WINDOW_DAYS: u32 = 14;

/// Minimum number of independent owners or distinct domains for corroboration.
const MIN_CORROBORATING: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationPolicy {
    /// Lowercased official/government/adjudicative domains.
    pub official_domains: Vec<String>,
    pub corroboration_threshold: f64,
    pub fallback_threshold: f64,
    pub sweep_window: Duration,
}

impl VerificationPolicy {
    #[must_use]
    pub fn new<I, S>(official_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            official_domains: official_domains
                .into_iter()
                .map(|d| d.as_ref().trim().trim_start_matches("*.").to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            corroboration_threshold: DEFAULT_CORROBORATION_THRESHOLD,
            fallback_threshold: DEFAULT_FALLBACK_THRESHOLD,
            sweep_window: Duration::days(i64::from(DEFAULT_SWEEP_WINDOW_DAYS)),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig, official_domains: &[String]) -> Self {
        Self {
            corroboration_threshold: config.corroboration_threshold,
            fallback_threshold: config.fallback_threshold,
            sweep_window: Duration::days(i64::from(config.sweep_window_days)),
            ..Self::new(official_domains)
        }
    }

    /// Whether `host` (or its registrable `domain`) is, or sits under, an
    /// allow-listed official domain.
    #[must_use]
    pub fn is_official(&self, host: Option<&str>, domain: Option<&str>) -> Option<String> {
        self.official_domains
            .iter()
            .find(|entry| {
                let entry = entry.as_str();
                domain.is_some_and(|d| d == entry)
                    || host.is_some_and(|h| {
                        h == entry
                            || h.strip_suffix(entry)
                                .is_some_and(|prefix| prefix.ends_with('.'))
                    })
            })
            .cloned()
    }
}

/// Why a verification check ended where it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationReason {
    /// A source sits on an allow-listed official domain.
    OfficialDomain { domain: String },
    /// Two or more independent owners at or above the corroboration threshold.
    HighCredibility { owners: usize },
    /// Two or more independent owners at or above the fallback threshold.
    IndependentOwners { owners: usize },
    AlreadyOfficial,
    AlreadyCorroborated,
    InsufficientEvidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub event_id: Uuid,
    pub previous: VerificationLevel,
    pub current: VerificationLevel,
    pub reason: VerificationReason,
}

impl VerificationOutcome {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Outcome of a [`Verifier::verify_batch`] pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub outcomes: Vec<VerificationOutcome>,
    pub summary: JobSummary,
}

/// Outcome of a [`Verifier::sweep`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Unverified events inside the window.
    pub considered: usize,
    pub groups: usize,
    pub upgraded: Vec<Uuid>,
    /// Considered events left unverified.
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
}

impl SweepReport {
    #[must_use]
    pub fn to_summary(&self) -> JobSummary {
        JobSummary {
            job: "verification_sweep".to_string(),
            processed: self.considered,
            succeeded: self.considered - self.failures.len(),
            failed: self.failures.len(),
            failures: self.failures.clone(),
        }
    }
}

type SweepKey = (Uuid, Category, NaiveDate, u64);

pub struct Verifier {
    credibility: Arc<CredibilityStore>,
    policy: VerificationPolicy,
}

impl Verifier {
    #[must_use]
    pub fn new(credibility: Arc<CredibilityStore>, policy: VerificationPolicy) -> Self {
        Self {
            credibility,
            policy,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    #[must_use]
    pub fn credibility(&self) -> &Arc<CredibilityStore> {
        &self.credibility
    }

    /// Official allow-list entry matched by `source`, if any.
    #[must_use]
    pub fn official_match(&self, source: &Source) -> Option<String> {
        let host = host_of(&source.canonical_url).or_else(|| host_of(&source.raw_url));
        self.policy
            .is_official(host.as_deref(), source.domain.as_deref())
    }

    /// Distinct independent owners among `sources` whose effective
    /// credibility is at least `threshold`.
    fn credible_owner_count(&self, sources: &[Source], threshold: f64) -> Result<usize, EvidenceError> {
        let mut owners = HashSet::new();
        for source in sources {
            let Some(key) = owner_key(source) else {
                continue;
            };
            if self.credibility.try_effective(&source.name)? >= threshold {
                owners.insert(key);
            }
        }
        Ok(owners.len())
    }

    /// Synchronous check of one event against its own sources.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::CredibilityUnavailable`] if the credibility
    /// store cannot be read. The event is left untouched in that case.
    pub fn verify_event(&self, event: &mut RawEvent) -> Result<VerificationOutcome, EvidenceError> {
        let previous = event.verification;
        let event_id = event.id;
        let outcome = |current, reason| VerificationOutcome {
            event_id,
            previous,
            current,
            reason,
        };

        if previous.is_terminal() {
            return Ok(outcome(previous, VerificationReason::AlreadyOfficial));
        }

        if let Some(domain) = event.sources.iter().find_map(|s| self.official_match(s)) {
            let current = previous
                .promote(VerificationLevel::Official)
                .unwrap_or(previous);
            event.verification = current;
            return Ok(outcome(current, VerificationReason::OfficialDomain { domain }));
        }

        if previous == VerificationLevel::Corroborated {
            return Ok(outcome(previous, VerificationReason::AlreadyCorroborated));
        }

        let high = self.credible_owner_count(&event.sources, self.policy.corroboration_threshold)?;
        let reason = if high >= MIN_CORROBORATING {
            Some(VerificationReason::HighCredibility { owners: high })
        } else if event.sources.len() >= MIN_CORROBORATING {
            let fallback =
                self.credible_owner_count(&event.sources, self.policy.fallback_threshold)?;
            (fallback >= MIN_CORROBORATING)
                .then_some(VerificationReason::IndependentOwners { owners: fallback })
        } else {
            None
        };

        match reason {
            Some(reason) => {
                event.verification = VerificationLevel::Corroborated;
                Ok(outcome(VerificationLevel::Corroborated, reason))
            }
            None => Ok(outcome(previous, VerificationReason::InsufficientEvidence)),
        }
    }

    /// Run [`Self::verify_event`] over `events`, recording failures and
    /// continuing.
    pub fn verify_batch(&self, events: &mut [RawEvent]) -> VerifyReport {
        let mut summary = JobSummary::new("verify");
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events.iter_mut() {
            match self.verify_event(event) {
                Ok(outcome) => {
                    if outcome.changed() {
                        tracing::info!(
                            event_id = %outcome.event_id,
                            from = %outcome.previous,
                            to = %outcome.current,
                            "event verification upgraded"
                        );
                    }
                    outcomes.push(outcome);
                    summary.record_success();
                }
                Err(e) => {
                    tracing::warn!(event_id = %event.id, error = %e, "verification check failed; skipping");
                    summary.record_failure(event.id, e.to_string());
                }
            }
        }
        VerifyReport { outcomes, summary }
    }

    /// Periodic domain-diversity sweep over unverified events that occurred
    /// within the policy window before `now`.
    ///
    /// Corroborated and official events are never touched. Events whose
    /// title leaves no fingerprint tokens are recorded as failures.
    pub fn sweep(&self, events: &mut [RawEvent], now: DateTime<Utc>) -> SweepReport {
        let window_start = now - self.policy.sweep_window;
        let mut report = SweepReport::default();
        let mut groups: BTreeMap<SweepKey, Vec<usize>> = BTreeMap::new();

        for (idx, event) in events.iter().enumerate() {
            if event.verification != VerificationLevel::Unverified
                || event.occurred_at < window_start
                || event.occurred_at > now
            {
                continue;
            }
            report.considered += 1;

            if !event.title.chars().any(char::is_alphanumeric) {
                tracing::warn!(event_id = %event.id, "event title has no fingerprint tokens; skipping");
                report.failures.push(ItemFailure {
                    id: event.id,
                    reason: "empty title fingerprint".to_string(),
                });
                continue;
            }

            let key = (
                event.brand_id,
                event.category,
                day_bucket(event.occurred_at),
                text_fingerprint(&event.title, event.snippet.as_deref()),
            );
            groups.entry(key).or_default().push(idx);
        }
        report.groups = groups.len();

        for members in groups.values() {
            let domains: HashSet<&str> = members
                .iter()
                .flat_map(|&idx| events[idx].sources.iter())
                .filter_map(|s| s.domain.as_deref())
                .collect();
            let domain_count = domains.len();
            if domain_count < MIN_CORROBORATING {
                report.skipped += members.len();
                continue;
            }
            for &idx in members {
                let event = &mut events[idx];
                if let Some(next) = event.verification.promote(VerificationLevel::Corroborated) {
                    event.verification = next;
                    report.upgraded.push(event.id);
                    tracing::debug!(event_id = %event.id, domains = domain_count, "sweep corroborated event");
                }
            }
        }

        tracing::info!(
            considered = report.considered,
            groups = report.groups,
            upgraded = report.upgraded.len(),
            failed = report.failures.len(),
            "verification sweep complete"
        );
        report
    }
}

#[cfg(test)]
#[path = "verification_test.rs"]
mod tests;
