//! Error types for grade derivation
//!
//! Component errors are collected rather than returned one at a time, so a
//! caller sees every problem with its input in a single response.

use crate::grade::GradeId;
use crate::types::{GradePoints, IntervalName};
use serde::Serialize;
use std::fmt;

/// A single problem found while deriving a grade matrix
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GradingError {
    /// Non-base grade without a vertical input
    #[error("missing vertical input for grade '{grade}'")]
    MissingVerticalInput {
        /// Grade lacking an input
        grade: GradeId,
    },

    /// Median at or below zero
    #[error("median for grade '{grade}' must be positive, got {median}")]
    NonPositiveMedian {
        /// Grade whose median failed
        grade: GradeId,
        /// Offending median
        median: f64,
    },

    /// Negative horizontal interval
    #[error("horizontal interval {interval} must not be negative, got {value}")]
    InvalidInterval {
        /// Interval name
        interval: IntervalName,
        /// Offending value
        value: f64,
    },

    /// Input keyed by a grade outside the ladder
    #[error("grade '{grade}' is not part of the ladder")]
    UnknownGrade {
        /// Unknown grade
        grade: GradeId,
    },

    /// Vertical input given for the base grade
    #[error("base grade '{grade}' does not take a vertical input")]
    BaseGradeInput {
        /// The base grade
        grade: GradeId,
    },

    /// NaN or infinite number
    #[error("{field} must be a finite number")]
    NonFiniteInput {
        /// Field holding the value
        field: String,
    },

    /// Band that is out of order, non-positive or overflows
    #[error("band for grade '{grade}' must be finite with 0 < ld <= lq <= m <= uq <= ud, got {points:?}")]
    InvalidBand {
        /// Grade owning the band
        grade: GradeId,
        /// Offending band
        points: GradePoints,
    },

    /// Base value disagreeing with the base grade's median
    #[error("base value {base_value} does not match the base grade median {median}")]
    BaseValueMismatch {
        /// Supplied base value
        base_value: f64,
        /// Median of the base band
        median: f64,
    },

    /// Intervals that do not reproduce a stored band
    #[error("intervals do not reproduce the band of grade '{grade}'")]
    IntervalMismatch {
        /// Grade whose band disagrees
        grade: GradeId,
    },
}

impl GradingError {
    /// Grade this error refers to, if any
    #[must_use]
    pub fn grade(&self) -> Option<&GradeId> {
        match self {
            Self::MissingVerticalInput { grade }
            | Self::NonPositiveMedian { grade, .. }
            | Self::UnknownGrade { grade }
            | Self::BaseGradeInput { grade }
            | Self::InvalidBand { grade, .. }
            | Self::IntervalMismatch { grade } => Some(grade),
            Self::InvalidInterval { .. }
            | Self::NonFiniteInput { .. }
            | Self::BaseValueMismatch { .. } => None,
        }
    }
}

/// Every component error found for one input
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<GradingError>);

impl ValidationErrors {
    /// Create empty collection
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    #[inline]
    pub fn push(&mut self, error: GradingError) {
        self.0.push(error);
    }

    /// Number of errors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate recorded errors
    pub fn iter(&self) -> std::slice::Iter<'_, GradingError> {
        self.0.iter()
    }

    /// Check whether any error matches the predicate
    pub fn any(&self, predicate: impl FnMut(&GradingError) -> bool) -> bool {
        self.0.iter().any(predicate)
    }

    /// `Ok(value)` if empty, otherwise `Err(self)`
    ///
    /// # Errors
    /// Returns the collection itself when it holds at least one error
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// Consume into the underlying list
    #[must_use]
    pub fn into_vec(self) -> Vec<GradingError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for (i, error) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<GradingError> for ValidationErrors {
    fn from(error: GradingError) -> Self {
        Self(vec![error])
    }
}

impl Extend<GradingError> for ValidationErrors {
    fn extend<I: IntoIterator<Item = GradingError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<GradingError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = GradingError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ValidationErrors {
    type Item = GradingError;
    type IntoIter = std::vec::IntoIter<GradingError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a GradingError;
    type IntoIter = std::slice::Iter<'a, GradingError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
