use serde::{Deserialize, Serialize};

/// Content hash of a component's raw vertex-buffer bytes.
///
/// This is the identity fingerprint used for exact-match shortcutting and for
/// keying the output tables. Hashes are compared as opaque strings; syntax
/// validation lives in [`crate::utils::validation`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a match was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Full and LOD component share a content hash
    Hash,
    /// Chosen by the two-stage geometric similarity search
    Geometry,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash => write!(f, "hash"),
            Self::Geometry => write!(f, "geometry"),
        }
    }
}

/// Confidence level derived from a similarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
    Exact,
}

impl Confidence {
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score >= 1.0 {
            Self::Exact
        } else if score >= 0.95 {
            Self::High
        } else if score >= 0.80 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}
