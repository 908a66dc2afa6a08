use serde::{Deserialize, Serialize};

/// Trust tier of an event.
///
/// Ordered `Unverified < Corroborated < Official`. Levels only ever move up;
/// use [`VerificationLevel::promote`] rather than assigning directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VerificationLevel {
    #[default]
    Unverified,
    Corroborated,
    Official,
}

impl VerificationLevel {
    /// Map an arbitrary upstream label onto a verification level.
    ///
    /// Unrecognised labels map to [`VerificationLevel::Unverified`], so a
    /// malformed upstream value can never grant trust.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "corroborated" | "verified" | "confirmed" => VerificationLevel::Corroborated,
            "official" | "government" | "regulator" | "court" | "adjudicated" => {
                VerificationLevel::Official
            }
            _ => VerificationLevel::Unverified,
        }
    }

    /// Returns `target` when it is strictly higher than `self`, else `None`.
    #[must_use]
    pub fn promote(self, target: VerificationLevel) -> Option<VerificationLevel> {
        (target > self).then_some(target)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == VerificationLevel::Official
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationLevel::Unverified => "unverified",
            VerificationLevel::Corroborated => "corroborated",
            VerificationLevel::Official => "official",
        }
    }
}

impl std::fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
