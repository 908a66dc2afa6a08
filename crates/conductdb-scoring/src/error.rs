use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("event {event_id} belongs to brand {found}, not {expected}")]
    BrandMismatch {
        event_id: Uuid,
        expected: Uuid,
        found: Uuid,
    },

    #[error("rating {0} is outside 1..=5")]
    RatingOutOfRange(i64),
}
