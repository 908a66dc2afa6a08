//! Per-source credibility numbers.
//!
//! The store is an explicit object shared behind an `Arc`; each verifier,
//! job, or test owns whichever instance it was handed. Adjustment policy
//! lives outside this module: callers only read effective values or write
//! new base/dynamic numbers.

use std::collections::HashMap;
use std::sync::RwLock;

use conductdb_core::CredibilityEntry;
use serde::{Deserialize, Serialize};

use crate::error::EvidenceError;

/// Effective credibility assumed for sources with no record.
pub const DEFAULT_CREDIBILITY: f64 = 0.6;

const BASE_RANGE: (f64, f64) = (0.0, 1.0);
const DYNAMIC_RANGE: (f64, f64) = (-0.5, 0.5);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CredibilityRecord {
    pub base: f64,
    pub dynamic: f64,
}

impl CredibilityRecord {
    /// # Errors
    ///
    /// Returns [`EvidenceError::OutOfRange`] if `base` is outside `[0, 1]` or
    /// `dynamic` is outside `[-0.5, 0.5]`.
    pub fn new(base: f64, dynamic: f64) -> Result<Self, EvidenceError> {
        check_range("base", base, BASE_RANGE)?;
        check_range("dynamic", dynamic, DYNAMIC_RANGE)?;
        Ok(Self { base, dynamic })
    }

    #[must_use]
    pub fn effective(&self) -> f64 {
        (self.base + self.dynamic).clamp(0.0, 1.0)
    }
}

/// Admin listing row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredibilityListing {
    pub source: String,
    pub base: f64,
    pub dynamic: f64,
    pub effective: f64,
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), EvidenceError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(EvidenceError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct CredibilityStore {
    // key -> (display name, record)
    records: RwLock<HashMap<String, (String, CredibilityRecord)>>,
}

impl CredibilityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from reference-file entries.
    ///
    /// # Errors
    ///
    /// Returns the first validation error among `entries`.
    pub fn from_entries(entries: &[CredibilityEntry]) -> Result<Self, EvidenceError> {
        let mut records = HashMap::with_capacity(entries.len());
        for entry in entries {
            if entry.source.trim().is_empty() {
                return Err(EvidenceError::EmptySourceName);
            }
            let record = CredibilityRecord::new(entry.base, entry.dynamic)?;
            records.insert(key(&entry.source), (entry.source.trim().to_string(), record));
        }
        Ok(Self {
            records: RwLock::new(records),
        })
    }

    /// Effective credibility of `name`, or [`DEFAULT_CREDIBILITY`] when unknown.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::CredibilityUnavailable`] if the store's lock
    /// was poisoned by a panicking writer.
    pub fn try_effective(&self, name: &str) -> Result<f64, EvidenceError> {
        let records = self
            .records
            .read()
            .map_err(|e| EvidenceError::CredibilityUnavailable(e.to_string()))?;
        Ok(records
            .get(&key(name))
            .map_or(DEFAULT_CREDIBILITY, |(_, r)| r.effective()))
    }

    /// Like [`Self::try_effective`] but falls back to the default on error.
    #[must_use]
    pub fn effective(&self, name: &str) -> f64 {
        self.try_effective(name).unwrap_or_else(|e| {
            tracing::warn!(source = name, error = %e, "credibility read failed; using default");
            DEFAULT_CREDIBILITY
        })
    }

    /// # Errors
    ///
    /// Returns [`EvidenceError`] for an empty name or out-of-range values.
    pub fn upsert(
        &self,
        name: &str,
        base: f64,
        dynamic: f64,
    ) -> Result<CredibilityRecord, EvidenceError> {
        let record = CredibilityRecord::new(base, dynamic)?;
        self.write(name, |_| record)
    }

    /// Replace the base credibility, keeping any existing dynamic adjustment.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError`] for an empty name or out-of-range value.
    pub fn set_base(&self, name: &str, base: f64) -> Result<CredibilityRecord, EvidenceError> {
        check_range("base", base, BASE_RANGE)?;
        self.write(name, |existing| CredibilityRecord {
            base,
            dynamic: existing.map_or(0.0, |r| r.dynamic),
        })
    }

    /// Replace the dynamic adjustment. Unknown sources start from the default base.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError`] for an empty name or out-of-range value.
    pub fn set_dynamic(
        &self,
        name: &str,
        dynamic: f64,
    ) -> Result<CredibilityRecord, EvidenceError> {
        check_range("dynamic", dynamic, DYNAMIC_RANGE)?;
        self.write(name, |existing| CredibilityRecord {
            base: existing.map_or(DEFAULT_CREDIBILITY, |r| r.base),
            dynamic,
        })
    }

    fn write(
        &self,
        name: &str,
        update: impl FnOnce(Option<&CredibilityRecord>) -> CredibilityRecord,
    ) -> Result<CredibilityRecord, EvidenceError> {
        let display = name.trim();
        if display.is_empty() {
            return Err(EvidenceError::EmptySourceName);
        }
        let mut records = self
            .records
            .write()
            .map_err(|e| EvidenceError::CredibilityUnavailable(e.to_string()))?;
        let k = key(display);
        let record = update(records.get(&k).map(|(_, r)| r));
        records.insert(k, (display.to_string(), record));
        Ok(record)
    }

    /// All records, sorted by source name.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::CredibilityUnavailable`] on a poisoned lock.
    pub fn snapshot(&self) -> Result<Vec<CredibilityListing>, EvidenceError> {
        let records = self
            .records
            .read()
            .map_err(|e| EvidenceError::CredibilityUnavailable(e.to_string()))?;
        let mut rows: Vec<CredibilityListing> = records
            .values()
            .map(|(name, r)| CredibilityListing {
                source: name.clone(),
                base: r.base,
                dynamic: r.dynamic,
                effective: r.effective(),
            })
            .collect();
        rows.sort_by(|a, b| a.source.cmp(&b.source));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_source_reads_default() {
        let store = CredibilityStore::new();
        assert_eq!(store.effective("Nobody Weekly"), DEFAULT_CREDIBILITY);
    }

    #[test]
    fn effective_clamps_base_plus_dynamic() {
        let store = CredibilityStore::new();
        store.upsert("Reuters", 0.9, 0.4).unwrap();
        store.upsert("Tabloid", 0.2, -0.5).unwrap();
        assert_eq!(store.effective("Reuters"), 1.0);
        assert_eq!(store.effective("Tabloid"), 0.0);
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let store = CredibilityStore::new();
        store.upsert("The Guardian", 0.85, 0.0).unwrap();
        assert!((store.effective("  the guardian ") - 0.85).abs() < 1e-9);
    }

    #[test]
    fn set_base_keeps_dynamic() {
        let store = CredibilityStore::new();
        store.upsert("CNN", 0.7, 0.1).unwrap();
        let record = store.set_base("CNN", 0.5).unwrap();
        assert_eq!(record.dynamic, 0.1);
        assert!((store.effective("cnn") - 0.6).abs() < 1e-9);
    }

    #[test]
    fn set_dynamic_on_unknown_starts_from_default_base() {
        let store = CredibilityStore::new();
        let record = store.set_dynamic("New Outlet", -0.2).unwrap();
        assert_eq!(record.base, DEFAULT_CREDIBILITY);
        assert!((store.effective("new outlet") - 0.4).abs() < 1e-9);
    }

    #[test]
    fn writes_reject_out_of_range_values() {
        let store = CredibilityStore::new();
        assert!(matches!(
            store.set_base("X", 1.5),
            Err(EvidenceError::OutOfRange { field: "base", .. })
        ));
        assert!(matches!(
            store.set_dynamic("X", 0.9),
            Err(EvidenceError::OutOfRange { field: "dynamic", .. })
        ));
        assert!(matches!(
            store.upsert("X", f64::NAN, 0.0),
            Err(EvidenceError::OutOfRange { .. })
        ));
    }

    #[test]
    fn writes_reject_empty_name() {
        let store = CredibilityStore::new();
        assert!(matches!(
            store.upsert("  ", 0.5, 0.0),
            Err(EvidenceError::EmptySourceName)
        ));
    }

    #[test]
    fn from_entries_seeds_and_snapshot_sorts() {
        let store = CredibilityStore::from_entries(&[
            CredibilityEntry {
                source: "Reuters".to_string(),
                base: 0.9,
                dynamic: 0.0,
            },
            CredibilityEntry {
                source: "BBC".to_string(),
                base: 0.88,
                dynamic: -0.1,
            },
        ])
        .unwrap();
        let rows = store.snapshot().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source, "BBC");
        assert!((rows[0].effective - 0.78).abs() < 1e-9);
    }

    #[test]
    fn isolated_stores_do_not_share_state() {
        let a = CredibilityStore::new();
        let b = CredibilityStore::new();
        a.upsert("Reuters", 0.95, 0.0).unwrap();
        assert_eq!(b.effective("Reuters"), DEFAULT_CREDIBILITY);
    }
}
