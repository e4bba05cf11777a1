//! Testing utilities for the grading workspace
//!
//! Shared ladders, inputs and float assertions.

#![allow(missing_docs)]

use grading_core::{GlobalHorizontalIntervals, GradeId, GradeLadder, GradingInput, VerticalInput};

pub fn grade(name: &str) -> GradeId {
    GradeId::new(name).unwrap()
}

/// `[Senior, Base]` with `Base` as base
pub fn two_grade_ladder() -> GradeLadder {
    GradeLadder::from_names(["Senior", "Base"], "Base").unwrap()
}

/// Five grades with the base in the middle
pub fn five_grade_ladder() -> GradeLadder {
    GradeLadder::from_names(["Director", "Lead", "Mid", "Junior", "Intern"], "Mid").unwrap()
}

/// Base 1000, Senior +10%, every interval 10%
pub fn two_grade_input() -> GradingInput {
    GradingInput {
        base_value: 1000.0,
        vertical_input: VerticalInput::new().with(grade("Senior"), 0.10),
        intervals: GlobalHorizontalIntervals::uniform(0.10),
    }
}

/// Input for [`five_grade_ladder`] with the given base value and one step
/// size above and below the base
pub fn five_grade_input(base_value: f64, step: f64) -> GradingInput {
    GradingInput {
        base_value,
        vertical_input: VerticalInput::new()
            .with(grade("Director"), step)
            .with(grade("Lead"), step)
            .with(grade("Junior"), -step)
            .with(grade("Intern"), -step),
        intervals: GlobalHorizontalIntervals {
            ld_to_lq: 0.08,
            lq_to_m: 0.10,
            m_to_uq: 0.10,
            uq_to_ud: 0.08,
        },
    }
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}

pub fn assert_relative(actual: f64, expected: f64, tolerance: f64) {
    let scale = actual.abs().max(expected.abs()).max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance * scale,
        "expected {expected} within relative {tolerance}, got {actual}"
    );
}
