use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("{field} value {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("source name must be non-empty")]
    EmptySourceName,

    #[error("credibility store unavailable: {0}")]
    CredibilityUnavailable(String),
}
