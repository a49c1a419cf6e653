use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable key of a lesson in the catalog and in persisted progress.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(String);

impl LessonId {
    /// Creates a new `LessonId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id and returns the owned key
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LessonId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LessonId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing a `LessonId` from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse LessonId from {:?}", self.raw)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for LessonId {
    type Err = ParseIdError;

    /// Accepts lowercase ASCII letters, digits and underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');
        if valid {
            Ok(Self::new(trimmed))
        } else {
            Err(ParseIdError {
                raw: s.to_string(),
            })
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_id_display() {
        let id = LessonId::new("control_flow");
        assert_eq!(id.to_string(), "control_flow");
    }

    #[test]
    fn test_lesson_id_from_str_trims() {
        let id: LessonId = " intro ".parse().unwrap();
        assert_eq!(id, LessonId::new("intro"));
    }

    #[test]
    fn test_lesson_id_from_str_invalid() {
        assert!("".parse::<LessonId>().is_err());
        assert!("Intro".parse::<LessonId>().is_err());
        assert!("../etc".parse::<LessonId>().is_err());
    }

    #[test]
    fn test_lesson_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&LessonId::new("functions")).unwrap();
        assert_eq!(json, "\"functions\"");
    }
}
