//! Vertical propagation
//!
//! Computes each grade's median by compounding the vertical steps outward
//! from the base grade. A grade two steps away is derived from its neighbor's
//! median, never directly from the base value.

use crate::error::{GradingError, ValidationErrors};
use crate::grade::GradeId;
use crate::ladder::GradeLadder;
use crate::types::{MedianMap, RankOverlap, VerticalInput};
use std::collections::HashMap;

/// Result of a successful propagation
#[derive(Debug, Clone, PartialEq)]
pub struct Propagation {
    /// Unrounded median per grade, in ladder order
    pub medians: MedianMap,
    /// Adjacent grades whose pay does not decrease with rank
    pub warnings: Vec<RankOverlap>,
}

/// Turns a base value and per-grade steps into medians
#[derive(Debug, Clone, Copy, Default)]
pub struct VerticalPropagator;

impl VerticalPropagator {
    /// Create new propagator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Check input keys and values against the ladder
    ///
    /// Reports unknown grades, an entry for the base grade, non-finite steps
    /// and every non-base grade without a step.
    #[must_use]
    pub fn validate_input(&self, ladder: &GradeLadder, input: &VerticalInput) -> Vec<GradingError> {
        let mut errors = Vec::new();

        for (grade, pct) in input.iter() {
            if !ladder.contains(grade) {
                errors.push(GradingError::UnknownGrade { grade: grade.clone() });
            } else if ladder.is_base(grade) {
                errors.push(GradingError::BaseGradeInput { grade: grade.clone() });
            } else if !pct.is_finite() {
                errors.push(GradingError::NonFiniteInput {
                    field: format!("vertical_input.{grade}"),
                });
            }
        }

        for grade in ladder.ids() {
            if !ladder.is_base(grade) && input.get(grade).is_none() {
                errors.push(GradingError::MissingVerticalInput { grade: grade.clone() });
            }
        }

        errors
    }

    /// Compute medians for every grade of the ladder
    ///
    /// `medians[base] = base_value`, then for each grade `g` with neighbor
    /// `n` toward the base: `medians[g] = medians[n] * (1 + input[g])`.
    ///
    /// # Errors
    /// Returns all input problems plus every grade whose median comes out
    /// non-positive. Grades downstream of a failed grade are not reported
    /// again.
    pub fn propagate(
        &self,
        ladder: &GradeLadder,
        base_value: f64,
        input: &VerticalInput,
    ) -> Result<Propagation, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.extend(self.validate_input(ladder, input));

        let base = ladder.base();
        let mut resolved: HashMap<&GradeId, f64> = HashMap::with_capacity(ladder.len());

        if !base_value.is_finite() {
            errors.push(GradingError::NonFiniteInput {
                field: "base_value".to_string(),
            });
        } else if base_value <= 0.0 {
            errors.push(GradingError::NonPositiveMedian {
                grade: base.clone(),
                median: base_value,
            });
        } else {
            resolved.insert(base, base_value);
        }

        for grade in ladder.propagation_order().into_iter().skip(1) {
            let Some(neighbor) = ladder.neighbor_toward_base(grade) else {
                continue;
            };
            let Some(&parent) = resolved.get(neighbor) else {
                continue;
            };
            let Some(step) = input.get(grade).filter(|s| s.is_finite()) else {
                continue;
            };

            let median = parent * (1.0 + step);
            if median.is_finite() && median > 0.0 {
                resolved.insert(grade, median);
            } else {
                errors.push(GradingError::NonPositiveMedian {
                    grade: grade.clone(),
                    median,
                });
            }
        }

        if !errors.is_empty() {
            tracing::debug!("vertical propagation rejected: {}", errors);
            return Err(errors);
        }

        let medians: MedianMap = ladder
            .ids()
            .iter()
            .filter_map(|g| resolved.get(g).map(|m| (g.clone(), *m)))
            .collect();
        let warnings = rank_overlaps(ladder, &medians);

        for w in &warnings {
            tracing::warn!(
                "grade '{}' ({}) does not out-earn '{}' ({})",
                w.higher,
                w.higher_median,
                w.lower,
                w.lower_median
            );
        }

        Ok(Propagation { medians, warnings })
    }
}

/// Adjacent rank pairs where the higher grade's median is not above the lower
#[must_use]
pub fn rank_overlaps(ladder: &GradeLadder, medians: &MedianMap) -> Vec<RankOverlap> {
    ladder
        .ids()
        .windows(2)
        .filter_map(|pair| {
            let higher_median = *medians.get(&pair[0])?;
            let lower_median = *medians.get(&pair[1])?;
            (higher_median <= lower_median).then(|| RankOverlap {
                higher: pair[0].clone(),
                lower: pair[1].clone(),
                higher_median,
                lower_median,
            })
        })
        .collect()
}

/// Step that turns the neighbor's median into this grade's median
///
/// Inverse of the propagation formula: `median / neighbor_median - 1`.
/// `None` when the neighbor median is not positive.
#[must_use]
pub fn implied_step(median: f64, neighbor_median: f64) -> Option<f64> {
    (neighbor_median > 0.0 && median.is_finite()).then(|| median / neighbor_median - 1.0)
}
