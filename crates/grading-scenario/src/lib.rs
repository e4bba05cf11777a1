//! Grading Scenario
//!
//! Named compensation scenarios over the grading core.
//!
//! # Core Concepts
//!
//! - [`ScenarioStore`]: Owns every scenario and the single current pointer
//! - [`lifecycle`]: `DRAFT -> CURRENT -> ARCHIVED` state machine
//! - [`ComparisonEngine`]: Side-by-side tables with rebuilt inputs
//! - [`BudgetImpactEstimator`]: Headcount-weighted median deltas
//! - [`ScenarioRepository`]: Persistence seam
//!
//! # Example
//!
//! ```rust
//! use grading_core::{GlobalHorizontalIntervals, GradeId, GradeLadder, GradingInput, VerticalInput};
//! use grading_scenario::{EngineConfig, NewScenario, ScenarioStatus, ScenarioStore};
//!
//! let store = ScenarioStore::in_memory(EngineConfig::default()).unwrap();
//! let ladder = GradeLadder::from_names(["Senior", "Base"], "Base").unwrap();
//! let input = GradingInput {
//!     base_value: 1000.0,
//!     vertical_input: VerticalInput::new().with(GradeId::new("Senior").unwrap(), 0.10),
//!     intervals: GlobalHorizontalIntervals::uniform(0.10),
//! };
//!
//! let draft = store.create_draft(ladder, NewScenario::new(input)).unwrap();
//! let current = store.apply_as_current(draft.id).unwrap();
//! assert_eq!(current.status, ScenarioStatus::Current);
//! ```

#![warn(unreachable_pub)]

pub mod budget;
pub mod comparison;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod persistence;
pub mod store;
pub mod types;

pub use budget::{BudgetImpact, BudgetImpactEstimator, GradeImpact, HeadcountSnapshot};
pub use comparison::{
    reconstruct_step, Comparison, ComparisonCell, ComparisonColumn, ComparisonEngine,
    ComparisonRow, DataInconsistency, InputSource, IntervalColumn,
};
pub use config::{EngineConfig, DEFAULT_RECONSTRUCTION_TOLERANCE};
pub use error::{PersistenceError, ScenarioError};
pub use lifecycle::{allowed_transitions, validate_transition, IllegalTransition, LifecycleAction};
pub use persistence::{JsonFileRepository, MemoryRepository, ScenarioRepository};
pub use store::{ScenarioStore, Snapshot};
pub use types::{
    LegacyScenario, NewScenario, Scenario, ScenarioId, ScenarioMetrics, ScenarioStatus,
    UnknownStatus,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{
        BudgetImpact, Comparison, EngineConfig, HeadcountSnapshot, NewScenario, Scenario,
        ScenarioError, ScenarioId, ScenarioStatus, ScenarioStore,
    };
    pub use grading_core::{GlobalHorizontalIntervals, GradeId, GradeLadder, GradingInput, VerticalInput};
}
