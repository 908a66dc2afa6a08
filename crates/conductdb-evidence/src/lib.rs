//! Evidence handling: URL normalization, ownership and credibility lookups,
//! near-duplicate clustering, and the verification state machine.

pub mod credibility;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod ownership;
pub mod verification;

pub use credibility::{CredibilityListing, CredibilityRecord, CredibilityStore, DEFAULT_CREDIBILITY};
pub use dedup::{
    cluster_events, duplicate_ref, is_duplicate, merge_sources, title_similarity, DedupConfig,
    DedupReport, DuplicateRef, EventCluster,
};
pub use error::EvidenceError;
pub use ingest::{build_source, prepare_event, SourceContext};
pub use normalize::{canonicalize_url, normalize_tokens, registrable_domain, text_fingerprint};
pub use ownership::{independent_owner_count, DomainOwnership, OwnershipTable};
pub use verification::{
    SweepReport, VerificationOutcome, VerificationPolicy, VerificationReason, Verifier,
    VerifyReport,
};
