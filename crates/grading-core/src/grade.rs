//! Grade identifiers
//!
//! Provides [`GradeId`], the validated key every grade-indexed map uses, and
//! [`Grade`], the positional view of a grade inside a ladder.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Validated grade identifier
///
/// Non-empty, no surrounding whitespace, no control characters.
///
/// # Examples
/// - `"Senior"`
/// - `"Grade 7"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GradeId(String);

impl GradeId {
    /// Create a grade id, trimming surrounding whitespace
    ///
    /// # Errors
    /// Returns error if the id is blank or contains control characters
    pub fn new(id: impl Into<String>) -> Result<Self, GradeIdError> {
        let raw = id.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(GradeIdError::Blank);
        }
        if trimmed.chars().any(char::is_control) {
            return Err(GradeIdError::ControlCharacter(trimmed.escape_debug().to_string()));
        }

        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GradeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GradeId {
    type Err = GradeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for GradeId {
    type Error = GradeIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GradeId> for String {
    fn from(id: GradeId) -> Self {
        id.0
    }
}

impl AsRef<str> for GradeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for GradeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A grade positioned in a ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grade {
    /// Grade identifier
    pub id: GradeId,
    /// Position in the hierarchy (0 = highest paid)
    pub rank: usize,
    /// Whether this is the anchor grade
    pub is_base: bool,
}

/// Errors related to grade identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradeIdError {
    /// Empty or whitespace-only id
    #[error("grade id must not be blank")]
    Blank,

    /// Id contains control characters
    #[error("grade id contains control characters: {0}")]
    ControlCharacter(String),
}
