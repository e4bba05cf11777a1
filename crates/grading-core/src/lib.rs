//! Grading Core
//!
//! Salary band derivation over an ordered grade ladder.
//!
//! # Core Concepts
//!
//! - [`GradeLadder`]: Ordered grades with one base (anchor) grade
//! - [`VerticalPropagator`]: Compounds per-grade steps outward from the base median
//! - [`HorizontalBandCalculator`]: Expands a median into LD/LQ/M/UQ/UD
//! - [`derive`]: Runs both and collects every input error
//!
//! # Example
//!
//! ```rust
//! use grading_core::{derive, GlobalHorizontalIntervals, GradeId, GradeLadder, GradingInput,
//!     Precision, VerticalInput};
//!
//! let ladder = GradeLadder::from_names(["Senior", "Base"], "Base").unwrap();
//! let input = GradingInput {
//!     base_value: 1000.0,
//!     vertical_input: VerticalInput::new().with(GradeId::new("Senior").unwrap(), 0.10),
//!     intervals: GlobalHorizontalIntervals::uniform(0.10),
//! };
//!
//! let derivation = derive(&ladder, &input, Precision::default()).unwrap();
//! assert_eq!(derivation.grades[&GradeId::new("Senior").unwrap()].m, 1100.0);
//! ```

#![warn(unreachable_pub)]

mod error;
mod grade;
mod horizontal;
mod ladder;
mod matrix;
mod types;
mod vertical;

pub use error::{GradingError, ValidationErrors};
pub use grade::{Grade, GradeId, GradeIdError};
pub use horizontal::HorizontalBandCalculator;
pub use ladder::{GradeLadder, LadderError, LadderSpec};
pub use matrix::{derive, Derivation};
pub use types::{
    mean, GlobalHorizontalIntervals, GradeMatrix, GradePoints, GradingInput, IntervalName,
    MedianMap, Precision, RankOverlap, VerticalInput,
};
pub use vertical::{implied_step, rank_overlaps, Propagation, VerticalPropagator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
