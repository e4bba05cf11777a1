//! Full matrix derivation
//!
//! Runs vertical propagation and horizontal expansion for one input and
//! collects every component error before failing.

use crate::error::{GradingError, ValidationErrors};
use crate::horizontal::HorizontalBandCalculator;
use crate::ladder::GradeLadder;
use crate::types::{GradeMatrix, GradingInput, MedianMap, Precision, RankOverlap};
use crate::vertical::VerticalPropagator;

/// Everything derived from one [`GradingInput`]
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    /// Rounded band per grade, in ladder order
    pub grades: GradeMatrix,
    /// Unrounded medians, in ladder order
    pub medians: MedianMap,
    /// Mean of the vertical inputs
    pub vertical_avg: f64,
    /// Mean of the four intervals
    pub horizontal_avg: f64,
    /// Non-fatal rank overlap warnings
    pub warnings: Vec<RankOverlap>,
}

/// Derive the grade matrix for an input
///
/// # Errors
/// Returns interval and propagation errors together
pub fn derive(
    ladder: &GradeLadder,
    input: &GradingInput,
    precision: Precision,
) -> Result<Derivation, ValidationErrors> {
    let calculator = HorizontalBandCalculator::new(input.intervals, precision);
    let propagation =
        VerticalPropagator::new().propagate(ladder, input.base_value, &input.vertical_input);

    let (calculator, propagation) = match (calculator, propagation) {
        (Ok(c), Ok(p)) => (c, p),
        (c, p) => {
            let mut errors = ValidationErrors::new();
            if let Err(e) = c {
                errors.extend(e);
            }
            if let Err(e) = p {
                errors.extend(e);
            }
            return Err(errors);
        }
    };

    let grades = calculator.expand_all(&propagation.medians);
    let vertical_avg = input.vertical_input.average();

    // Expansion can overflow even when every median is finite.
    let mut errors: ValidationErrors = grades
        .iter()
        .filter(|(_, points)| !points.is_valid())
        .map(|(grade, points)| GradingError::InvalidBand {
            grade: grade.clone(),
            points: *points,
        })
        .collect();
    if !vertical_avg.is_finite() {
        errors.push(GradingError::NonFiniteInput {
            field: "vertical_input".to_string(),
        });
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Derivation {
        grades,
        medians: propagation.medians,
        vertical_avg,
        horizontal_avg: calculator.horizontal_average(),
        warnings: propagation.warnings,
    })
}
