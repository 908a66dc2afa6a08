//! Operational reference tables: official domains, media ownership, and
//! seed source credibility.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::events::OwnerKind;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerEntry {
    pub domain: String,
    pub owner: String,
    #[serde(default)]
    pub kind: OwnerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityEntry {
    pub source: String,
    pub base: f64,
    #[serde(default)]
    pub dynamic: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTables {
    /// Registrable domains whose presence makes an event official.
    #[serde(default)]
    pub official_domains: Vec<String>,
    #[serde(default)]
    pub owners: Vec<OwnerEntry>,
    #[serde(default)]
    pub credibility: Vec<CredibilityEntry>,
}

/// Load and validate the reference tables from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_reference_tables(path: &Path) -> Result<ReferenceTables, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReferenceFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_reference_tables(&content)
}

/// Parse and validate reference tables from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_reference_tables(content: &str) -> Result<ReferenceTables, ConfigError> {
    let tables: ReferenceTables =
        serde_yaml::from_str(content).map_err(ConfigError::ReferenceFileParse)?;
    validate_reference_tables(&tables)?;
    Ok(tables)
}

fn validate_reference_tables(tables: &ReferenceTables) -> Result<(), ConfigError> {
    let mut seen_official = HashSet::new();
    for domain in &tables.official_domains {
        let key = domain.trim().to_lowercase();
        if key.is_empty() {
            return Err(ConfigError::Validation(
                "official domain must be non-empty".to_string(),
            ));
        }
        if !seen_official.insert(key) {
            return Err(ConfigError::Validation(format!(
                "duplicate official domain: '{domain}'"
            )));
        }
    }

    let mut seen_domains = HashSet::new();
    for entry in &tables.owners {
        if entry.domain.trim().is_empty() || entry.owner.trim().is_empty() {
            return Err(ConfigError::Validation(
                "owner entries need a non-empty domain and owner".to_string(),
            ));
        }
        if !seen_domains.insert(entry.domain.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate owner domain: '{}'",
                entry.domain
            )));
        }
    }

    let mut seen_sources = HashSet::new();
    for entry in &tables.credibility {
        if entry.source.trim().is_empty() {
            return Err(ConfigError::Validation(
                "credibility source name must be non-empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&entry.base) {
            return Err(ConfigError::Validation(format!(
                "source '{}' has base credibility {} outside [0, 1]",
                entry.source, entry.base
            )));
        }
        if !(-0.5..=0.5).contains(&entry.dynamic) {
            return Err(ConfigError::Validation(format!(
                "source '{}' has dynamic adjustment {} outside [-0.5, 0.5]",
                entry.source, entry.dynamic
            )));
        }
        if !seen_sources.insert(entry.source.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate credibility source: '{}'",
                entry.source
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_tables() {
        let yaml = r"
official_domains:
  - osha.gov
owners:
  - domain: cnn.com
    owner: Warner Bros. Discovery
  - domain: reuters.com
    owner: Thomson Reuters
    kind: wire
credibility:
  - source: Reuters
    base: 0.9
";
        let tables = parse_reference_tables(yaml).expect("valid tables");
        assert_eq!(tables.official_domains, vec!["osha.gov".to_string()]);
        assert_eq!(tables.owners[0].kind, OwnerKind::Publisher);
        assert_eq!(tables.owners[1].kind, OwnerKind::Wire);
        assert_eq!(tables.credibility[0].dynamic, 0.0);
    }

    #[test]
    fn empty_document_sections_default() {
        let tables = parse_reference_tables("official_domains: []").expect("valid");
        assert!(tables.owners.is_empty());
        assert!(tables.credibility.is_empty());
    }

    #[test]
    fn rejects_base_out_of_range() {
        let yaml = "credibility:\n  - source: Blog\n    base: 1.4\n";
        let err = parse_reference_tables(yaml).unwrap_err();
        assert!(err.to_string().contains("outside [0, 1]"));
    }

    #[test]
    fn rejects_dynamic_out_of_range() {
        let yaml = "credibility:\n  - source: Blog\n    base: 0.5\n    dynamic: -0.7\n";
        let err = parse_reference_tables(yaml).unwrap_err();
        assert!(err.to_string().contains("[-0.5, 0.5]"));
    }

    #[test]
    fn rejects_duplicate_owner_domain_case_insensitively() {
        let yaml = r"
owners:
  - domain: CNN.com
    owner: A
  - domain: cnn.com
    owner: B
";
        let err = parse_reference_tables(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate owner domain"));
    }

    #[test]
    fn rejects_empty_official_domain() {
        let err = parse_reference_tables("official_domains: ['  ']").unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn load_reference_tables_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("reference.yaml");
        assert!(
            path.exists(),
            "reference.yaml missing at {path:?} — required for this test"
        );
        let result = load_reference_tables(&path);
        assert!(result.is_ok(), "failed to load reference.yaml: {result:?}");
        let tables = result.unwrap();
        assert!(!tables.official_domains.is_empty());
        assert!(!tables.owners.is_empty());
    }
}
