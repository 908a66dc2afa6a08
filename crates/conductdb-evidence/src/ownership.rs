//! Registrable domain → controlling media owner.

use std::collections::{HashMap, HashSet};

use conductdb_core::{OwnerEntry, OwnerKind, Source};
use serde::{Deserialize, Serialize};

/// Owner name reported for domains missing from the reference table.
pub const UNKNOWN_OWNER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainOwnership {
    pub owner: String,
    pub kind: OwnerKind,
}

impl DomainOwnership {
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            owner: UNKNOWN_OWNER.to_string(),
            kind: OwnerKind::Publisher,
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.owner == UNKNOWN_OWNER
    }
}

/// Lookup table backed by the `owners` section of the reference file.
#[derive(Debug, Clone, Default)]
pub struct OwnershipTable {
    by_domain: HashMap<String, DomainOwnership>,
}

impl OwnershipTable {
    #[must_use]
    pub fn from_entries(entries: &[OwnerEntry]) -> Self {
        let by_domain = entries
            .iter()
            .map(|e| {
                (
                    e.domain.trim().to_ascii_lowercase(),
                    DomainOwnership {
                        owner: e.owner.trim().to_string(),
                        kind: e.kind,
                    },
                )
            })
            .collect();
        Self { by_domain }
    }

    /// Owner of a registrable domain; `{"Unknown", publisher}` when absent.
    #[must_use]
    pub fn resolve(&self, domain: &str) -> DomainOwnership {
        self.by_domain
            .get(&domain.trim().to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(DomainOwnership::unknown)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_domain.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_domain.is_empty()
    }
}

/// Identity a source contributes when counting independent owners.
///
/// Sources without a registrable domain contribute nothing. A domain with
/// no known owner stands for itself, so two unrelated unknown outlets still
/// count as two owners while mirrors of one domain count once.
#[must_use]
pub fn owner_key(source: &Source) -> Option<String> {
    let domain = source.domain.as_deref()?;
    if source.owner.is_empty() || source.owner == UNKNOWN_OWNER {
        Some(format!("domain:{domain}"))
    } else {
        Some(format!("owner:{}", source.owner.to_lowercase()))
    }
}

/// Number of distinct independent owners behind `sources`.
pub fn independent_owner_count<'a>(sources: impl IntoIterator<Item = &'a Source>) -> usize {
    sources
        .into_iter()
        .filter_map(owner_key)
        .collect::<HashSet<_>>()
        .len()
}
