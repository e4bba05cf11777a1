//! Side-by-side scenario comparison
//!
//! Aligns scenarios on their shared ladder and reports, for every non-base
//! grade, the vertical step that produced each scenario's median. When a
//! scenario has no stored steps they are rebuilt from its medians; when it
//! does, the rebuilt value is checked against the stored one.

use crate::error::ScenarioError;
use crate::types::{Scenario, ScenarioId, ScenarioStatus};
use grading_core::{implied_step, GlobalHorizontalIntervals, GradeId, GradeLadder, GradePoints};
use serde::Serialize;

/// Where a cell's vertical step came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Taken from the scenario's stored input
    Stored,
    /// Rebuilt from the scenario's medians
    Reconstructed,
}

/// One scenario's values for one grade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonCell {
    /// Band of the grade; `None` if the scenario's matrix lacks it
    pub points: Option<GradePoints>,
    /// Step toward the base; `None` for the base grade
    pub vertical_input_pct: Option<f64>,
    /// Origin of `vertical_input_pct`
    pub source: Option<InputSource>,
}

/// One grade across all compared scenarios
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    /// Grade
    pub grade: GradeId,
    /// Rank in the ladder
    pub rank: usize,
    /// Whether this is the base grade
    pub is_base: bool,
    /// One cell per column, same order as [`Comparison::columns`]
    pub cells: Vec<ComparisonCell>,
}

/// Header of one compared scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonColumn {
    /// Scenario id
    pub scenario_id: ScenarioId,
    /// Scenario name
    pub name: String,
    /// Scenario status
    pub status: ScenarioStatus,
}

/// Horizontal inputs of one compared scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalColumn {
    /// Scenario id
    pub scenario_id: ScenarioId,
    /// Band spread percentages
    pub intervals: GlobalHorizontalIntervals,
    /// Mean vertical step
    pub vertical_avg: f64,
    /// Mean horizontal interval
    pub horizontal_avg: f64,
}

/// Stored step disagreeing with the step implied by the medians
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataInconsistency {
    /// Scenario id
    pub scenario_id: ScenarioId,
    /// Grade
    pub grade: GradeId,
    /// Stored step
    pub stored: f64,
    /// Step implied by the medians
    pub reconstructed: f64,
}

/// Comparison table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Shared ladder
    pub ladder: GradeLadder,
    /// Compared scenarios, in request order
    pub columns: Vec<ComparisonColumn>,
    /// One row per grade, in ladder order
    pub rows: Vec<ComparisonRow>,
    /// Horizontal inputs per scenario
    pub intervals: Vec<IntervalColumn>,
    /// Non-fatal mismatches between stored and implied steps
    pub warnings: Vec<DataInconsistency>,
}

/// Builds comparison tables
#[derive(Debug, Clone, Copy)]
pub struct ComparisonEngine {
    tolerance: f64,
}

impl ComparisonEngine {
    /// Create engine with a relative tolerance for stored vs implied steps
    #[inline]
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Compare scenarios sharing one ladder
    ///
    /// # Errors
    /// - `InvalidRequest` for fewer than two scenarios or repeated ids
    /// - `LadderMismatch` if any ladder differs from the first scenario's
    pub fn compare(&self, scenarios: &[&Scenario]) -> Result<Comparison, ScenarioError> {
        let [first, rest @ ..] = scenarios else {
            return Err(ScenarioError::InvalidRequest(
                "comparison needs at least two scenarios".to_string(),
            ));
        };
        if rest.is_empty() {
            return Err(ScenarioError::InvalidRequest(
                "comparison needs at least two scenarios".to_string(),
            ));
        }
        for (i, s) in scenarios.iter().enumerate() {
            if scenarios[..i].iter().any(|other| other.id == s.id) {
                return Err(ScenarioError::InvalidRequest(format!(
                    "scenario {} listed more than once",
                    s.id
                )));
            }
            if s.ladder != first.ladder {
                return Err(ScenarioError::LadderMismatch {
                    expected: first.id,
                    found: s.id,
                });
            }
        }

        let ladder = first.ladder.clone();
        let mut warnings = Vec::new();
        let steps: Vec<Vec<Option<(f64, InputSource)>>> = scenarios
            .iter()
            .map(|s| {
                let (column, mismatches) = self.resolve_steps(s);
                warnings.extend(mismatches);
                column
            })
            .collect();

        let rows = ladder
            .grades()
            .map(|grade| {
                let cells = scenarios
                    .iter()
                    .zip(&steps)
                    .map(|(s, column)| {
                        let step = column[grade.rank];
                        ComparisonCell {
                            points: s.points(&grade.id).copied(),
                            vertical_input_pct: step.map(|(pct, _)| pct),
                            source: step.map(|(_, source)| source),
                        }
                    })
                    .collect();
                ComparisonRow {
                    grade: grade.id,
                    rank: grade.rank,
                    is_base: grade.is_base,
                    cells,
                }
            })
            .collect();

        for w in &warnings {
            tracing::warn!(
                "scenario {} grade '{}': stored step {} but medians imply {}",
                w.scenario_id,
                w.grade,
                w.stored,
                w.reconstructed
            );
        }

        Ok(Comparison {
            ladder,
            columns: scenarios
                .iter()
                .map(|s| ComparisonColumn {
                    scenario_id: s.id,
                    name: s.name.clone(),
                    status: s.status,
                })
                .collect(),
            rows,
            intervals: scenarios
                .iter()
                .map(|s| IntervalColumn {
                    scenario_id: s.id,
                    intervals: s.intervals,
                    vertical_avg: s.vertical_avg,
                    horizontal_avg: s.horizontal_avg,
                })
                .collect(),
            warnings,
        })
    }

    /// Vertical step per grade (indexed by rank) for one scenario
    ///
    /// Stored steps win; missing ones are rebuilt from the medians as
    /// `median[g] / median[neighbor] - 1`. The base grade has no step.
    #[must_use]
    pub fn resolve_steps(
        &self,
        scenario: &Scenario,
    ) -> (Vec<Option<(f64, InputSource)>>, Vec<DataInconsistency>) {
        let ladder = &scenario.ladder;
        let mut mismatches = Vec::new();

        let steps = ladder
            .ids()
            .iter()
            .map(|grade| {
                let reconstructed = reconstruct_step(scenario, grade);
                let stored = scenario.vertical_input.as_ref().and_then(|v| v.get(grade));

                match (stored, reconstructed) {
                    (Some(stored), Some(rebuilt)) => {
                        if !within_tolerance(stored, rebuilt, self.tolerance) {
                            mismatches.push(DataInconsistency {
                                scenario_id: scenario.id,
                                grade: grade.clone(),
                                stored,
                                reconstructed: rebuilt,
                            });
                        }
                        Some((stored, InputSource::Stored))
                    }
                    (Some(stored), None) => Some((stored, InputSource::Stored)),
                    (None, Some(rebuilt)) => Some((rebuilt, InputSource::Reconstructed)),
                    (None, None) => None,
                }
            })
            .collect();

        (steps, mismatches)
    }
}

impl Default for ComparisonEngine {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_RECONSTRUCTION_TOLERANCE)
    }
}

/// Step implied by a scenario's medians for a grade; `None` for the base
#[must_use]
pub fn reconstruct_step(scenario: &Scenario, grade: &GradeId) -> Option<f64> {
    let neighbor = scenario.ladder.neighbor_toward_base(grade)?;
    implied_step(scenario.median(grade)?, scenario.median(neighbor)?)
}

/// Relative closeness, measured on the step ratio `1 + pct`
fn within_tolerance(stored: f64, rebuilt: f64, tolerance: f64) -> bool {
    let scale = (1.0 + stored).abs().max((1.0 + rebuilt).abs()).max(f64::EPSILON);
    (stored - rebuilt).abs() <= tolerance * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_is_relative_to_ratio() {
        assert!(within_tolerance(0.10, 0.10 + 1e-9, 1e-6));
        assert!(!within_tolerance(0.10, 0.1001, 1e-6));
        assert!(within_tolerance(0.0, 5e-7, 1e-6));
    }
}
