//! Horizontal band expansion
//!
//! Expands a median into the five reference points of its band using the
//! global intervals, working outward from M. Rounding happens once, on the
//! final values, never on intermediate links of the chain.

use crate::error::ValidationErrors;
use crate::types::{GlobalHorizontalIntervals, GradeMatrix, GradePoints, MedianMap, Precision};

/// Expands medians into bands with fixed intervals and precision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalBandCalculator {
    intervals: GlobalHorizontalIntervals,
    precision: Precision,
}

impl HorizontalBandCalculator {
    /// Create calculator for validated intervals
    ///
    /// # Errors
    /// Returns every negative or non-finite interval
    pub fn new(
        intervals: GlobalHorizontalIntervals,
        precision: Precision,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.extend(intervals.validate());
        errors.into_result(Self {
            intervals,
            precision,
        })
    }

    /// Intervals in use
    #[inline]
    #[must_use]
    pub fn intervals(&self) -> &GlobalHorizontalIntervals {
        &self.intervals
    }

    /// Precision in use
    #[inline]
    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Unrounded band for a median
    ///
    /// `LQ = M / (1 + lq_to_m)`, `LD = LQ / (1 + ld_to_lq)`,
    /// `UQ = M * (1 + m_to_uq)`, `UD = UQ * (1 + uq_to_ud)`.
    #[must_use]
    pub fn expand_raw(&self, median: f64) -> GradePoints {
        let i = &self.intervals;
        let lq = median / (1.0 + i.lq_to_m);
        let ld = lq / (1.0 + i.ld_to_lq);
        let uq = median * (1.0 + i.m_to_uq);
        let ud = uq * (1.0 + i.uq_to_ud);
        GradePoints {
            ld,
            lq,
            m: median,
            uq,
            ud,
        }
    }

    /// Rounded band for a median
    #[inline]
    #[must_use]
    pub fn expand(&self, median: f64) -> GradePoints {
        self.expand_raw(median).rounded(self.precision)
    }

    /// Rounded bands for every median, preserving order
    #[must_use]
    pub fn expand_all(&self, medians: &MedianMap) -> GradeMatrix {
        medians
            .iter()
            .map(|(grade, median)| (grade.clone(), self.expand(*median)))
            .collect()
    }

    /// Mean of the four intervals
    #[inline]
    #[must_use]
    pub fn horizontal_average(&self) -> f64 {
        self.intervals.average()
    }
}
