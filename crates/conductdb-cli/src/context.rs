//! Shared setup for CLI commands: config, reference tables, and file input.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use conductdb_core::{AppConfig, ReferenceTables};
use conductdb_evidence::{CredibilityStore, DedupConfig, OwnershipTable, VerificationPolicy, Verifier};
use conductdb_scoring::DealbreakerPolicy;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Everything a command needs besides its own input file.
pub(crate) struct RunContext {
    pub ownership: OwnershipTable,
    pub verifier: Verifier,
    pub dedup: DedupConfig,
    pub dealbreakers: DealbreakerPolicy,
    pub max_concurrent_brands: usize,
}

impl RunContext {
    pub(crate) fn from_tables(config: &AppConfig, tables: &ReferenceTables) -> anyhow::Result<Self> {
        let credibility = CredibilityStore::from_entries(&tables.credibility)
            .context("invalid credibility table")?;
        Ok(Self {
            ownership: OwnershipTable::from_entries(&tables.owners),
            verifier: Verifier::new(
                Arc::new(credibility),
                VerificationPolicy::from_config(config, &tables.official_domains),
            ),
            dedup: DedupConfig::from_config(config),
            dealbreakers: DealbreakerPolicy::from_config(config),
            max_concurrent_brands: config.recompute_max_concurrent_brands,
        })
    }

    /// Load config from the environment and reference tables from
    /// `reference`, falling back to the configured path.
    pub(crate) fn load(reference: Option<&Path>) -> anyhow::Result<Self> {
        let config = conductdb_core::load_app_config_from_env()?;
        let path = reference.unwrap_or(config.reference_path.as_path());
        let tables = conductdb_core::load_reference_tables(path)
            .with_context(|| format!("loading reference tables from {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            owners = tables.owners.len(),
            official_domains = tables.official_domains.len(),
            "reference tables loaded"
        );
        Self::from_tables(&config, &tables)
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_context() -> RunContext {
    let config = conductdb_core::config::build_app_config(|_| Err(std::env::VarError::NotPresent))
        .expect("default config");
    let tables = conductdb_core::parse_reference_tables(include_str!(
        "../../../config/reference.yaml"
    ))
    .expect("reference tables");
    RunContext::from_tables(&config, &tables).expect("context")
}
