//! Core value types for grade derivation
//!
//! Defines the inputs a caller supplies (base value, vertical inputs,
//! horizontal intervals) and the per-grade outputs derived from them.

use crate::error::GradingError;
use crate::grade::GradeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Derived band for every grade, in ladder order
pub type GradeMatrix = IndexMap<GradeId, GradePoints>;

/// Unrounded medians for every grade, in ladder order
pub type MedianMap = IndexMap<GradeId, f64>;

/// Percentage step per non-base grade
///
/// Each value is the signed step (0.10 = +10%) from the adjacent grade toward
/// the base to this grade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerticalInput(BTreeMap<GradeId, f64>);

impl VerticalInput {
    /// Create empty input
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the step for a grade, returning self
    #[must_use]
    pub fn with(mut self, grade: GradeId, pct: f64) -> Self {
        self.0.insert(grade, pct);
        self
    }

    /// Set the step for a grade
    pub fn insert(&mut self, grade: GradeId, pct: f64) -> Option<f64> {
        self.0.insert(grade, pct)
    }

    /// Step for a grade
    #[inline]
    #[must_use]
    pub fn get(&self, grade: &GradeId) -> Option<f64> {
        self.0.get(grade).copied()
    }

    /// Iterate (grade, step) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&GradeId, f64)> {
        self.0.iter().map(|(g, v)| (g, *v))
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no steps are set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Arithmetic mean of all steps, 0 when empty
    #[must_use]
    pub fn average(&self) -> f64 {
        mean(self.0.values().copied())
    }
}

impl FromIterator<(GradeId, f64)> for VerticalInput {
    fn from_iter<I: IntoIterator<Item = (GradeId, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Name of a horizontal interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalName {
    /// Lower decile to lower quartile
    LdToLq,
    /// Lower quartile to median
    LqToM,
    /// Median to upper quartile
    MToUq,
    /// Upper quartile to upper decile
    UqToUd,
}

impl IntervalName {
    /// All names in band order
    pub const ALL: [IntervalName; 4] = [Self::LdToLq, Self::LqToM, Self::MToUq, Self::UqToUd];

    /// Field name as used on the wire
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LdToLq => "ld_to_lq",
            Self::LqToM => "lq_to_m",
            Self::MToUq => "m_to_uq",
            Self::UqToUd => "uq_to_ud",
        }
    }
}

impl fmt::Display for IntervalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spread percentages applied to every grade's median
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalHorizontalIntervals {
    /// LD → LQ
    pub ld_to_lq: f64,
    /// LQ → M
    pub lq_to_m: f64,
    /// M → UQ
    pub m_to_uq: f64,
    /// UQ → UD
    pub uq_to_ud: f64,
}

impl GlobalHorizontalIntervals {
    /// Same percentage for all four intervals
    #[inline]
    #[must_use]
    pub fn uniform(pct: f64) -> Self {
        Self {
            ld_to_lq: pct,
            lq_to_m: pct,
            m_to_uq: pct,
            uq_to_ud: pct,
        }
    }

    /// Value of a named interval
    #[must_use]
    pub fn get(&self, name: IntervalName) -> f64 {
        match name {
            IntervalName::LdToLq => self.ld_to_lq,
            IntervalName::LqToM => self.lq_to_m,
            IntervalName::MToUq => self.m_to_uq,
            IntervalName::UqToUd => self.uq_to_ud,
        }
    }

    /// (name, value) pairs in band order
    pub fn iter(&self) -> impl Iterator<Item = (IntervalName, f64)> + '_ {
        IntervalName::ALL.into_iter().map(|name| (name, self.get(name)))
    }

    /// Arithmetic mean of the four intervals
    #[must_use]
    pub fn average(&self) -> f64 {
        mean(self.iter().map(|(_, v)| v))
    }

    /// Every problem with these intervals
    #[must_use]
    pub fn validate(&self) -> Vec<GradingError> {
        self.iter()
            .filter_map(|(interval, value)| {
                if !value.is_finite() {
                    Some(GradingError::NonFiniteInput {
                        field: format!("intervals.{interval}"),
                    })
                } else if value < 0.0 {
                    Some(GradingError::InvalidInterval { interval, value })
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Five reference points of a salary band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradePoints {
    /// Lower decile
    pub ld: f64,
    /// Lower quartile
    pub lq: f64,
    /// Median
    pub m: f64,
    /// Upper quartile
    pub uq: f64,
    /// Upper decile
    pub ud: f64,
}

impl GradePoints {
    /// Points as an array, lowest first
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> [f64; 5] {
        [self.ld, self.lq, self.m, self.uq, self.ud]
    }

    /// Check `ld ≤ lq ≤ m ≤ uq ≤ ud`
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.as_array().windows(2).all(|w| w[0] <= w[1])
    }

    /// Check the band is finite, positive and ordered
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite()) && self.ld > 0.0 && self.is_ordered()
    }

    /// Round every point to the given precision
    #[must_use]
    pub fn rounded(&self, precision: Precision) -> Self {
        Self {
            ld: precision.round(self.ld),
            lq: precision.round(self.lq),
            m: precision.round(self.m),
            uq: precision.round(self.uq),
            ud: precision.round(self.ud),
        }
    }
}

/// Currency precision in decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Precision(u32);

impl Precision {
    /// Largest supported number of decimal places
    pub const MAX_DECIMALS: u32 = 9;

    /// Create precision, clamped to [`Precision::MAX_DECIMALS`]
    #[inline]
    #[must_use]
    pub fn new(decimals: u32) -> Self {
        Self(decimals.min(Self::MAX_DECIMALS))
    }

    /// Number of decimal places
    #[inline]
    #[must_use]
    pub fn decimals(&self) -> u32 {
        self.0
    }

    /// Smallest representable step (0.01 for two decimals)
    #[must_use]
    pub fn unit(&self) -> f64 {
        1.0 / self.scale()
    }

    /// Round half away from zero
    ///
    /// Values too large to carry a fraction at this precision come back
    /// unchanged.
    #[must_use]
    pub fn round(&self, value: f64) -> f64 {
        const NO_FRACTION: f64 = 4_503_599_627_370_496.0; // 2^52
        let scale = self.scale();
        let scaled = value * scale;
        if !scaled.is_finite() || scaled.abs() >= NO_FRACTION {
            return value;
        }
        scaled.round() / scale
    }

    fn scale(self) -> f64 {
        10f64.powi(i32::try_from(self.0).unwrap_or(i32::MAX))
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self(2)
    }
}

/// Caller-supplied inputs for one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingInput {
    /// Median of the base grade
    pub base_value: f64,
    /// Per-grade steps toward the base
    #[serde(default)]
    pub vertical_input: VerticalInput,
    /// Band spread percentages
    pub intervals: GlobalHorizontalIntervals,
}

/// Adjacent grades whose medians do not decrease with rank
///
/// Pay-band overlap can be intentional, so this is reported, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankOverlap {
    /// Grade with the lower rank number (expected to pay more)
    pub higher: GradeId,
    /// Grade one rank below
    pub lower: GradeId,
    /// Median of `higher`
    pub higher_median: f64,
    /// Median of `lower`
    pub lower_median: f64,
}

/// Arithmetic mean, 0 for an empty sequence
#[must_use]
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(s: &str) -> GradeId {
        GradeId::new(s).unwrap()
    }

    #[test]
    fn precision_rounds_half_away_from_zero() {
        let p = Precision::default();
        assert_eq!(p.round(826.446_280_99), 826.45);
        assert_eq!(p.round(909.090_909), 909.09);
        assert_eq!(p.round(0.125), 0.13);
        assert_eq!(p.round(-0.125), -0.13);
        assert_eq!(p.unit(), 0.01);
    }

    #[test]
    fn precision_zero_decimals() {
        let p = Precision::new(0);
        assert_eq!(p.round(1234.5), 1235.0);
        assert_eq!(p.unit(), 1.0);
    }

    #[test]
    fn precision_keeps_huge_values() {
        let p = Precision::default();
        assert_eq!(p.round(1e307), 1e307);
        assert_eq!(p.round(1e20), 1e20);
        assert!(p.round(f64::MAX).is_finite());
    }

    #[test]
    fn precision_clamps() {
        assert_eq!(Precision::new(40).decimals(), Precision::MAX_DECIMALS);
    }

    #[test]
    fn vertical_average() {
        let input = VerticalInput::new()
            .with(grade("A"), 0.10)
            .with(grade("B"), 0.20)
            .with(grade("C"), -0.06);
        assert!((input.average() - 0.08).abs() < 1e-12);
        assert_eq!(VerticalInput::new().average(), 0.0);
    }

    #[test]
    fn horizontal_average_and_validate() {
        let intervals = GlobalHorizontalIntervals {
            ld_to_lq: 0.1,
            lq_to_m: 0.2,
            m_to_uq: 0.3,
            uq_to_ud: 0.4,
        };
        assert!((intervals.average() - 0.25).abs() < 1e-12);
        assert!(intervals.validate().is_empty());

        let bad = GlobalHorizontalIntervals {
            ld_to_lq: -0.1,
            lq_to_m: 0.0,
            m_to_uq: f64::NAN,
            uq_to_ud: -0.2,
        };
        let errors = bad.validate();
        assert_eq!(errors.len(), 3);
        assert!(matches!(
            errors[0],
            GradingError::InvalidInterval { interval: IntervalName::LdToLq, .. }
        ));
        assert!(matches!(errors[1], GradingError::NonFiniteInput { .. }));
    }

    #[test]
    fn zero_interval_is_valid() {
        assert!(GlobalHorizontalIntervals::uniform(0.0).validate().is_empty());
    }

    #[test]
    fn grade_points_order() {
        let ordered = GradePoints { ld: 1.0, lq: 2.0, m: 2.0, uq: 3.0, ud: 4.0 };
        assert!(ordered.is_ordered());

        let broken = GradePoints { ld: 1.0, lq: 3.0, m: 2.0, uq: 3.0, ud: 4.0 };
        assert!(!broken.is_ordered());
    }

    #[test]
    fn grade_points_validity() {
        assert!(GradePoints { ld: 1.0, lq: 2.0, m: 2.0, uq: 3.0, ud: 4.0 }.is_valid());
        assert!(!GradePoints { ld: 0.0, lq: 2.0, m: 2.0, uq: 3.0, ud: 4.0 }.is_valid());
        assert!(!GradePoints { ld: 1.0, lq: 2.0, m: 2.0, uq: 3.0, ud: f64::INFINITY }.is_valid());
        assert!(!GradePoints { ld: 5000.0, lq: 100.0, m: 1100.0, uq: 50.0, ud: 1.0 }.is_valid());
    }

    #[test]
    fn grading_input_deserializes() {
        let json = r#"{
            "base_value": 1000,
            "vertical_input": {"Senior": 0.1},
            "intervals": {"ld_to_lq": 0.1, "lq_to_m": 0.1, "m_to_uq": 0.1, "uq_to_ud": 0.1}
        }"#;
        let input: GradingInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.base_value, 1000.0);
        assert_eq!(input.vertical_input.get(&grade("Senior")), Some(0.1));
    }

    #[test]
    fn vertical_input_rejects_blank_keys() {
        let json = r#"{" ": 0.1}"#;
        assert!(serde_json::from_str::<VerticalInput>(json).is_err());
    }
}
