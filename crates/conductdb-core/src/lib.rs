//! Shared domain types and configuration for conductdb.

pub mod app_config;
pub mod category;
pub mod config;
pub mod events;
pub mod jobs;
pub mod preferences;
pub mod reference;
pub mod verification;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use category::{Category, PerCategory};
pub use config::{load_app_config, load_app_config_from_env};
pub use events::{
    ImpactDeltas, IncomingEvent, IncomingSource, LinkKind, OwnerKind, RawEvent, Source,
    MAX_EVENT_IMPACT,
};
pub use jobs::{ItemFailure, JobSummary};
pub use preferences::{Dealbreaker, UserPreferences};
pub use reference::{
    load_reference_tables, parse_reference_tables, CredibilityEntry, OwnerEntry, ReferenceTables,
};
pub use verification::VerificationLevel;

/// Stable identifier of a brand.
pub type BrandId = uuid::Uuid;
/// Stable identifier of an event.
pub type EventId = uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read reference file {path}: {source}")]
    ReferenceFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse reference file: {0}")]
    ReferenceFileParse(#[from] serde_yaml::Error),

    #[error("reference validation failed: {0}")]
    Validation(String),
}
