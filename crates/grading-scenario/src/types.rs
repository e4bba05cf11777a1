//! Scenario records
//!
//! Defines the stored scenario, its identifier and status, and the request
//! shapes used to create or edit one.

use chrono::{DateTime, Utc};
use grading_core::{
    GlobalHorizontalIntervals, GradeId, GradeLadder, GradeMatrix, GradePoints, GradingInput,
    MedianMap, RankOverlap, VerticalInput,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Unique scenario identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub Ulid);

impl ScenarioId {
    /// Generate new scenario ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ScenarioId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScenarioId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim()).map(Self)
    }
}

/// Lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioStatus {
    /// Editable proposal
    Draft,
    /// The single active scenario
    Current,
    /// Retired, terminal
    Archived,
}

impl ScenarioStatus {
    /// Upper-case wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Current => "CURRENT",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "CURRENT" => Ok(Self::Current),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Unrecognized status name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scenario status: {0}")]
pub struct UnknownStatus(pub String);

/// Derived metrics attached to a scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    /// Cost delta against the current scenario, once computed
    pub total_budget_impact: Option<f64>,
}

/// A named compensation proposal with its derived grade matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Identifier
    pub id: ScenarioId,
    /// Display name
    pub name: String,
    /// Lifecycle status
    pub status: ScenarioStatus,
    /// Ladder the matrix was derived against
    pub ladder: GradeLadder,
    /// Median of the base grade
    pub base_value: f64,
    /// Steps that produced the medians; absent for imported legacy data
    #[serde(default)]
    pub vertical_input: Option<VerticalInput>,
    /// Band spread percentages
    pub intervals: GlobalHorizontalIntervals,
    /// Rounded band per grade, in ladder order
    pub grades: GradeMatrix,
    /// Unrounded medians; empty for imported legacy data
    #[serde(default)]
    pub medians: MedianMap,
    /// Mean vertical step
    pub vertical_avg: f64,
    /// Mean horizontal interval
    pub horizontal_avg: f64,
    /// Rank overlap warnings from derivation
    #[serde(default)]
    pub warnings: Vec<RankOverlap>,
    /// Derived metrics
    #[serde(default)]
    pub metrics: ScenarioMetrics,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
    /// When the scenario became current
    #[serde(default)]
    pub applied_at: Option<DateTime<Utc>>,
    /// When the scenario was archived
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
}

impl Scenario {
    /// Band for a grade
    #[inline]
    #[must_use]
    pub fn points(&self, grade: &GradeId) -> Option<&GradePoints> {
        self.grades.get(grade)
    }

    /// Best available median: cached unrounded value, else the stored band's M
    #[must_use]
    pub fn median(&self, grade: &GradeId) -> Option<f64> {
        self.medians
            .get(grade)
            .copied()
            .or_else(|| self.grades.get(grade).map(|p| p.m))
    }

    /// Inputs this scenario was derived from, when they were stored
    #[must_use]
    pub fn input(&self) -> Option<GradingInput> {
        self.vertical_input.as_ref().map(|vertical_input| GradingInput {
            base_value: self.base_value,
            vertical_input: vertical_input.clone(),
            intervals: self.intervals,
        })
    }

    /// Whether the scenario is still editable
    #[inline]
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.status == ScenarioStatus::Draft
    }

    /// Whether the scenario is the active one
    #[inline]
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.status == ScenarioStatus::Current
    }
}

/// Request to create or edit a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScenario {
    /// Display name; generated when absent
    #[serde(default)]
    pub name: Option<String>,
    /// Derivation inputs
    #[serde(flatten)]
    pub input: GradingInput,
}

impl NewScenario {
    /// Unnamed request
    #[inline]
    #[must_use]
    pub fn new(input: GradingInput) -> Self {
        Self { name: None, input }
    }

    /// With name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// CURRENT data known only by its outputs
///
/// Older installations persisted the grade matrix without the vertical
/// steps that produced it. Importing such data keeps it comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyScenario {
    /// Display name
    pub name: String,
    /// Ladder of the stored matrix
    pub ladder: GradeLadder,
    /// Base median; taken from the base grade's band when absent
    #[serde(default)]
    pub base_value: Option<f64>,
    /// Stored band per grade
    pub grades: GradeMatrix,
    /// Stored intervals; implied from the base band when absent
    #[serde(default)]
    pub intervals: Option<GlobalHorizontalIntervals>,
}
