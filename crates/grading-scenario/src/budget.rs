//! Budget impact estimation
//!
//! Aggregates `headcount × (scenario median − current median)` per grade.

use crate::error::ScenarioError;
use crate::types::{Scenario, ScenarioId};
use grading_core::{GradeId, Precision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Employees per grade, as reported by the employee directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeadcountSnapshot(BTreeMap<GradeId, u32>);

impl HeadcountSnapshot {
    /// Create empty snapshot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Headcount for a grade, 0 when absent
    #[inline]
    #[must_use]
    pub fn get(&self, grade: &GradeId) -> u32 {
        self.0.get(grade).copied().unwrap_or(0)
    }

    /// Iterate (grade, headcount) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&GradeId, u32)> {
        self.0.iter().map(|(g, n)| (g, *n))
    }

    /// Total employees
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().map(|n| u64::from(*n)).sum()
    }
}

impl FromIterator<(GradeId, u32)> for HeadcountSnapshot {
    fn from_iter<I: IntoIterator<Item = (GradeId, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Impact contribution of one grade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeImpact {
    /// Grade
    pub grade: GradeId,
    /// Employees in the grade
    pub headcount: u32,
    /// Median in the evaluated scenario
    pub scenario_median: f64,
    /// Median in the current scenario
    pub current_median: f64,
    /// `headcount * (scenario_median - current_median)`
    pub impact: f64,
}

/// Budget impact of a scenario against the current one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetImpact {
    /// Evaluated scenario
    pub scenario_id: ScenarioId,
    /// Reference scenario, if any
    pub current_id: Option<ScenarioId>,
    /// Total impact; `None` when there is no current scenario
    pub total: Option<f64>,
    /// Per-grade breakdown in ladder order; empty without a current scenario
    pub per_grade: Vec<GradeImpact>,
}

/// Pure aggregation of median deltas weighted by headcount
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetImpactEstimator {
    precision: Precision,
}

impl BudgetImpactEstimator {
    /// Create estimator rounding totals to `precision`
    #[inline]
    #[must_use]
    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }

    /// Estimate the impact of `scenario` against `current`
    ///
    /// Uses the rounded medians of both scenarios. Zero when `scenario` is
    /// the current one, `None` when there is no current scenario.
    ///
    /// # Errors
    /// Returns `ScenarioError::LadderMismatch` if the ladders differ
    pub fn estimate(
        &self,
        scenario: &Scenario,
        current: Option<&Scenario>,
        headcount: &HeadcountSnapshot,
    ) -> Result<BudgetImpact, ScenarioError> {
        for (grade, _) in headcount.iter() {
            if !scenario.ladder.contains(grade) {
                tracing::warn!("ignoring headcount for grade '{}' outside the ladder", grade);
            }
        }

        let Some(current) = current else {
            return Ok(BudgetImpact {
                scenario_id: scenario.id,
                current_id: None,
                total: None,
                per_grade: Vec::new(),
            });
        };

        if current.ladder != scenario.ladder {
            return Err(ScenarioError::LadderMismatch {
                expected: current.id,
                found: scenario.id,
            });
        }

        let per_grade: Vec<GradeImpact> = scenario
            .ladder
            .ids()
            .iter()
            .filter_map(|grade| {
                let scenario_median = scenario.points(grade)?.m;
                let current_median = current.points(grade)?.m;
                let headcount = headcount.get(grade);
                let impact = if scenario.id == current.id {
                    0.0
                } else {
                    f64::from(headcount) * (scenario_median - current_median)
                };
                Some(GradeImpact {
                    grade: grade.clone(),
                    headcount,
                    scenario_median,
                    current_median,
                    impact,
                })
            })
            .collect();

        let total = self.precision.round(per_grade.iter().map(|g| g.impact).sum());

        tracing::debug!(
            "budget impact of {} against {}: {}",
            scenario.id,
            current.id,
            total
        );

        Ok(BudgetImpact {
            scenario_id: scenario.id,
            current_id: Some(current.id),
            total: Some(total),
            per_grade,
        })
    }
}
