//! Scenario store
//!
//! Readers load an immutable [`Snapshot`] without locking. Writers take a
//! single mutex, build the next snapshot from the loaded one, commit the
//! changed records to the repository and only then publish. A reader therefore
//! sees either the state before a write or the state after it, never a mix.

use crate::budget::{BudgetImpact, BudgetImpactEstimator, HeadcountSnapshot};
use crate::comparison::{Comparison, ComparisonEngine};
use crate::config::EngineConfig;
use crate::error::ScenarioError;
use crate::lifecycle::{check_action, LifecycleAction};
use crate::persistence::{check_loaded, JsonFileRepository, MemoryRepository, ScenarioRepository};
use crate::types::{LegacyScenario, NewScenario, Scenario, ScenarioId, ScenarioMetrics, ScenarioStatus};
use arc_swap::ArcSwap;
use chrono::Utc;
use grading_core::{
    derive, mean, GlobalHorizontalIntervals, GradeLadder, GradeMatrix, GradePoints, GradingError,
    HorizontalBandCalculator, Precision, ValidationErrors,
};
use parking_lot::Mutex;
use std::sync::Arc;
use ulid::{Generator, Ulid};

/// Immutable view of every scenario at one point in time
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    scenarios: im::OrdMap<ScenarioId, Arc<Scenario>>,
    current: Option<ScenarioId>,
}

impl Snapshot {
    /// Scenario by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.get(id).map(Arc::as_ref)
    }

    /// The current scenario, if any
    #[must_use]
    pub fn current(&self) -> Option<&Scenario> {
        self.current.as_ref().and_then(|id| self.get(id))
    }

    /// Id of the current scenario
    #[inline]
    #[must_use]
    pub fn current_id(&self) -> Option<ScenarioId> {
        self.current
    }

    /// Scenarios in id (creation) order
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values().map(Arc::as_ref)
    }

    /// Scenarios with the given status, or all of them
    #[must_use]
    pub fn list(&self, status: Option<ScenarioStatus>) -> Vec<&Scenario> {
        self.iter()
            .filter(|s| status.map_or(true, |wanted| s.status == wanted))
            .collect()
    }

    /// Number of scenarios with a status
    #[must_use]
    pub fn count(&self, status: ScenarioStatus) -> usize {
        self.iter().filter(|s| s.status == status).count()
    }

    /// Number of scenarios
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// True when the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    fn require(&self, id: ScenarioId) -> Result<&Arc<Scenario>, ScenarioError> {
        self.scenarios.get(&id).ok_or(ScenarioError::NotFound(id))
    }
}

/// Owner of every scenario and of the current pointer
pub struct ScenarioStore {
    state: ArcSwap<Snapshot>,
    writer: Mutex<()>,
    ids: Mutex<Generator>,
    repository: Arc<dyn ScenarioRepository>,
    config: EngineConfig,
}

impl ScenarioStore {
    /// Open a store over a repository, loading what it holds
    ///
    /// # Errors
    /// - `Persistence` if the repository cannot be read or holds more than
    ///   one current scenario
    /// - `Config` if the configuration is invalid
    pub fn open(
        repository: Arc<dyn ScenarioRepository>,
        config: EngineConfig,
    ) -> Result<Self, ScenarioError> {
        config.validate()?;
        let records = repository.load_all()?;
        let current = check_loaded(&records)?;
        let scenarios: im::OrdMap<ScenarioId, Arc<Scenario>> =
            records.into_iter().map(|s| (s.id, Arc::new(s))).collect();

        tracing::info!(
            "scenario store opened: {} scenarios, current {}",
            scenarios.len(),
            current.map_or_else(|| "none".to_string(), |id| id.to_string())
        );

        Ok(Self {
            state: ArcSwap::from_pointee(Snapshot { scenarios, current }),
            writer: Mutex::new(()),
            ids: Mutex::new(Generator::new()),
            repository,
            config,
        })
    }

    /// Open an empty process-local store
    ///
    /// # Errors
    /// Returns `Config` if the configuration is invalid
    pub fn in_memory(config: EngineConfig) -> Result<Self, ScenarioError> {
        Self::open(Arc::new(MemoryRepository::new()), config)
    }

    /// Open the store the configuration describes: file-backed when
    /// `data_path` is set, in-memory otherwise
    ///
    /// # Errors
    /// Returns error if the data file cannot be loaded
    pub fn from_config(config: EngineConfig) -> Result<Self, ScenarioError> {
        match &config.data_path {
            Some(path) => {
                let repository = JsonFileRepository::open(path.clone())?;
                Self::open(Arc::new(repository), config)
            }
            None => Self::in_memory(config),
        }
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consistent read view
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.state.load_full()
    }

    /// Scenario by id
    #[must_use]
    pub fn get(&self, id: ScenarioId) -> Option<Scenario> {
        self.state.load().get(&id).cloned()
    }

    /// The current scenario, if any
    #[must_use]
    pub fn current(&self) -> Option<Scenario> {
        self.state.load().current().cloned()
    }

    /// Scenarios in creation order, optionally filtered by status
    #[must_use]
    pub fn list(&self, status: Option<ScenarioStatus>) -> Vec<Scenario> {
        self.state.load().list(status).into_iter().cloned().collect()
    }

    /// Number of scenarios
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.load().len()
    }

    /// True when no scenario exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.load().is_empty()
    }

    /// Requested ladder, else the configured default
    ///
    /// # Errors
    /// Returns `InvalidRequest` when neither is available
    pub fn resolve_ladder(&self, requested: Option<GradeLadder>) -> Result<GradeLadder, ScenarioError> {
        requested
            .or_else(|| self.config.default_ladder.clone())
            .ok_or_else(|| {
                ScenarioError::InvalidRequest(
                    "no ladder given and no default ladder configured".to_string(),
                )
            })
    }

    /// Derive a matrix and store it as a new draft
    ///
    /// # Errors
    /// - `Validation` with every input problem found
    /// - `Persistence` if the repository rejects the write
    pub fn create_draft(
        &self,
        ladder: GradeLadder,
        request: NewScenario,
    ) -> Result<Scenario, ScenarioError> {
        let derivation = derive(&ladder, &request.input, self.config.precision)?;

        let _guard = self.writer.lock();
        let snapshot = self.state.load_full();
        let now = Utc::now();
        let id = self.next_id();
        let name = match request.name {
            Some(name) => normalize_name(&name)?,
            None => format!("Scenario {}", snapshot.len() + 1),
        };

        let scenario = Scenario {
            id,
            name,
            status: ScenarioStatus::Draft,
            ladder,
            base_value: request.input.base_value,
            vertical_input: Some(request.input.vertical_input),
            intervals: request.input.intervals,
            grades: derivation.grades,
            medians: derivation.medians,
            vertical_avg: derivation.vertical_avg,
            horizontal_avg: derivation.horizontal_avg,
            warnings: derivation.warnings,
            metrics: ScenarioMetrics::default(),
            created_at: now,
            updated_at: now,
            applied_at: None,
            archived_at: None,
        };

        self.publish(&snapshot, vec![scenario.clone()], snapshot.current)?;
        tracing::info!("created draft {} '{}'", scenario.id, scenario.name);
        Ok(scenario)
    }

    /// Replace a draft's inputs and re-derive its matrix
    ///
    /// Clears any recorded budget impact, which no longer matches.
    ///
    /// # Errors
    /// - `InvalidTransition` unless the scenario is a draft
    /// - `Validation` with every input problem found
    pub fn update_draft(
        &self,
        id: ScenarioId,
        request: NewScenario,
    ) -> Result<Scenario, ScenarioError> {
        let precision = self.config.precision;
        let updated = self.modify(id, LifecycleAction::Edit, |scenario, _| {
            let derivation = derive(&scenario.ladder, &request.input, precision)?;
            if let Some(name) = &request.name {
                scenario.name = normalize_name(name)?;
            }
            scenario.base_value = request.input.base_value;
            scenario.vertical_input = Some(request.input.vertical_input);
            scenario.intervals = request.input.intervals;
            scenario.grades = derivation.grades;
            scenario.medians = derivation.medians;
            scenario.vertical_avg = derivation.vertical_avg;
            scenario.horizontal_avg = derivation.horizontal_avg;
            scenario.warnings = derivation.warnings;
            scenario.metrics = ScenarioMetrics::default();
            Ok(())
        })?;
        tracing::info!("updated draft {}", id);
        Ok(updated)
    }

    /// Rename a draft
    ///
    /// # Errors
    /// - `InvalidTransition` unless the scenario is a draft
    /// - `InvalidRequest` for a blank name
    pub fn rename(&self, id: ScenarioId, name: &str) -> Result<Scenario, ScenarioError> {
        let name = normalize_name(name)?;
        self.modify(id, LifecycleAction::Edit, |scenario, _| {
            scenario.name = name;
            Ok(())
        })
    }

    /// Make a draft the current scenario, archiving the previous one
    ///
    /// # Errors
    /// - `NotFound` if the scenario does not exist
    /// - `InvalidTransition` unless the scenario is a draft
    /// - `ConcurrentApplyConflict` if another apply won the race
    pub fn apply_as_current(&self, id: ScenarioId) -> Result<Scenario, ScenarioError> {
        let observed = self.state.load().current_id();
        self.apply_expecting(id, observed)
    }

    /// Apply a draft only if `expected` is still the current scenario
    ///
    /// # Errors
    /// Same as [`Self::apply_as_current`]; the conflict is reported when the
    /// current scenario differs from `expected` at commit time
    pub fn apply_expecting(
        &self,
        id: ScenarioId,
        expected: Option<ScenarioId>,
    ) -> Result<Scenario, ScenarioError> {
        let _guard = self.writer.lock();
        let snapshot = self.state.load_full();
        let target = snapshot.require(id)?;
        check_action(LifecycleAction::Apply, target.status)
            .map_err(|_| transition_error(target, LifecycleAction::Apply))?;

        if snapshot.current != expected {
            tracing::warn!(
                "apply of {} lost the race: expected current {:?}, found {:?}",
                id,
                expected,
                snapshot.current
            );
            return Err(ScenarioError::ConcurrentApplyConflict {
                id,
                expected,
                actual: snapshot.current,
            });
        }

        let now = Utc::now();
        let mut changed = Vec::with_capacity(2);

        if let Some(previous_id) = snapshot.current {
            let previous = snapshot.require(previous_id)?;
            check_action(LifecycleAction::Supersede, previous.status)
                .map_err(|_| transition_error(previous, LifecycleAction::Supersede))?;
            let mut previous = Scenario::clone(previous);
            previous.status = ScenarioStatus::Archived;
            previous.archived_at = Some(now);
            previous.updated_at = now;
            changed.push(previous);
        }

        let mut applied = Scenario::clone(target);
        applied.status = ScenarioStatus::Current;
        applied.applied_at = Some(now);
        applied.updated_at = now;
        changed.push(applied.clone());

        // Stored impacts were measured against the outgoing current.
        let stale = snapshot
            .iter()
            .filter(|s| s.id != id && s.is_draft() && s.metrics.total_budget_impact.is_some())
            .map(|s| {
                let mut draft = s.clone();
                draft.metrics = ScenarioMetrics::default();
                draft.updated_at = now;
                draft
            });
        changed.extend(stale);

        self.publish(&snapshot, changed, Some(id))?;
        tracing::info!(
            "applied {} as current (superseded {})",
            id,
            expected.map_or_else(|| "none".to_string(), |p| p.to_string())
        );
        Ok(applied)
    }

    /// Archive a draft; other scenarios are untouched
    ///
    /// # Errors
    /// - `NotFound` if the scenario does not exist
    /// - `InvalidTransition` unless the scenario is a draft
    pub fn archive_draft(&self, id: ScenarioId) -> Result<Scenario, ScenarioError> {
        let archived = self.modify(id, LifecycleAction::ArchiveDraft, |scenario, _| {
            scenario.archived_at = Some(Utc::now());
            Ok(())
        })?;
        tracing::info!("archived draft {}", id);
        Ok(archived)
    }

    /// Import a current scenario known only by its grade matrix
    ///
    /// Intervals are implied from the base band when not given. Medians are
    /// taken from the bands, so reconstructed inputs carry the rounding of
    /// the stored data.
    ///
    /// # Errors
    /// - `CurrentAlreadySet` if a current scenario exists
    /// - `Validation` if the matrix does not fit the ladder, a band is
    ///   invalid, or `base_value` or `intervals` disagree with the base band
    pub fn import_legacy_current(&self, legacy: LegacyScenario) -> Result<Scenario, ScenarioError> {
        let LegacyScenario {
            name,
            ladder,
            base_value,
            grades,
            intervals,
        } = legacy;
        let name = normalize_name(&name)?;
        let grades = align_legacy_grades(&ladder, grades)?;

        let base_points = grades.get(ladder.base()).copied().ok_or_else(|| {
            ScenarioError::InvalidRequest(format!("no band for base grade '{}'", ladder.base()))
        })?;
        let precision = self.config.precision;
        let mut errors = ValidationErrors::new();
        if let Some(value) = base_value {
            if !value.is_finite() {
                errors.push(GradingError::NonFiniteInput {
                    field: "base_value".to_string(),
                });
            } else if value <= 0.0 {
                errors.push(GradingError::NonPositiveMedian {
                    grade: ladder.base().clone(),
                    median: value,
                });
            } else if (value - base_points.m).abs() > precision.unit() / 2.0 {
                errors.push(GradingError::BaseValueMismatch {
                    base_value: value,
                    median: base_points.m,
                });
            }
        }
        let intervals = match intervals {
            Some(intervals) => {
                let interval_errors = intervals.validate();
                if interval_errors.is_empty()
                    && !reproduces_band(intervals, precision, &base_points)
                {
                    errors.push(GradingError::IntervalMismatch {
                        grade: ladder.base().clone(),
                    });
                }
                errors.extend(interval_errors);
                intervals
            }
            None => implied_intervals(&base_points)?,
        };
        errors.into_result(())?;

        let _guard = self.writer.lock();
        let snapshot = self.state.load_full();
        if let Some(current) = snapshot.current {
            return Err(ScenarioError::CurrentAlreadySet { current });
        }

        let now = Utc::now();
        let mut scenario = Scenario {
            id: self.next_id(),
            name,
            status: ScenarioStatus::Current,
            ladder,
            base_value: base_points.m,
            vertical_input: None,
            intervals,
            grades,
            medians: Default::default(),
            vertical_avg: 0.0,
            horizontal_avg: intervals.average(),
            warnings: Vec::new(),
            metrics: ScenarioMetrics::default(),
            created_at: now,
            updated_at: now,
            applied_at: Some(now),
            archived_at: None,
        };
        let engine = ComparisonEngine::new(self.config.reconstruction_tolerance);
        let (steps, _) = engine.resolve_steps(&scenario);
        scenario.vertical_avg = mean(steps.into_iter().flatten().map(|(pct, _)| pct));

        self.publish(&snapshot, vec![scenario.clone()], Some(scenario.id))?;
        tracing::info!("imported legacy current {} '{}'", scenario.id, scenario.name);
        Ok(scenario)
    }

    /// Budget impact of a scenario against the current one
    ///
    /// # Errors
    /// - `NotFound` if the scenario does not exist
    /// - `LadderMismatch` if it uses a different ladder than the current one
    pub fn budget_impact(
        &self,
        id: ScenarioId,
        headcount: &HeadcountSnapshot,
    ) -> Result<BudgetImpact, ScenarioError> {
        let snapshot = self.state.load();
        let scenario = snapshot.require(id)?;
        self.estimator()
            .estimate(scenario, snapshot.current(), headcount)
    }

    /// Compute the budget impact of a draft and store it on the draft
    ///
    /// # Errors
    /// - `InvalidTransition` unless the scenario is a draft
    /// - `LadderMismatch` if it uses a different ladder than the current one
    pub fn record_budget_impact(
        &self,
        id: ScenarioId,
        headcount: &HeadcountSnapshot,
    ) -> Result<BudgetImpact, ScenarioError> {
        let estimator = self.estimator();
        let mut report = None;
        self.modify(id, LifecycleAction::Edit, |scenario, snapshot| {
            let impact = estimator.estimate(scenario, snapshot.current(), headcount)?;
            scenario.metrics.total_budget_impact = impact.total;
            report = Some(impact);
            Ok(())
        })?;
        report.ok_or(ScenarioError::NotFound(id))
    }

    /// Side-by-side comparison of two or more scenarios
    ///
    /// # Errors
    /// - `InvalidRequest` for fewer than two ids or repeated ids
    /// - `NotFound` for an unknown id
    /// - `LadderMismatch` if the scenarios use different ladders
    pub fn compare(&self, ids: &[ScenarioId]) -> Result<Comparison, ScenarioError> {
        check_comparison_ids(ids)?;
        let snapshot = self.state.load();
        let scenarios = ids
            .iter()
            .map(|id| snapshot.require(*id).map(Arc::as_ref))
            .collect::<Result<Vec<_>, _>>()?;
        self.comparison_engine().compare(&scenarios)
    }

    /// Comparison with the current scenario as the first column
    ///
    /// The current scenario is added unless already listed.
    ///
    /// # Errors
    /// Same as [`Self::compare`]
    pub fn compare_with_current(&self, ids: &[ScenarioId]) -> Result<Comparison, ScenarioError> {
        let current = self.state.load().current_id();
        let mut all = Vec::with_capacity(ids.len() + 1);
        if let Some(current) = current.filter(|c| !ids.contains(c)) {
            all.push(current);
        }
        all.extend_from_slice(ids);
        self.compare(&all)
    }

    /// Comparison engine using the configured tolerance
    #[must_use]
    pub fn comparison_engine(&self) -> ComparisonEngine {
        ComparisonEngine::new(self.config.reconstruction_tolerance)
    }

    fn estimator(&self) -> BudgetImpactEstimator {
        BudgetImpactEstimator::new(self.config.precision)
    }

    /// Run an edit on one scenario under the writer lock
    fn modify<F>(
        &self,
        id: ScenarioId,
        action: LifecycleAction,
        edit: F,
    ) -> Result<Scenario, ScenarioError>
    where
        F: FnOnce(&mut Scenario, &Snapshot) -> Result<(), ScenarioError>,
    {
        let _guard = self.writer.lock();
        let snapshot = self.state.load_full();
        let existing = snapshot.require(id)?;
        let status =
            check_action(action, existing.status).map_err(|_| transition_error(existing, action))?;

        let mut next = Scenario::clone(existing);
        edit(&mut next, &snapshot)?;
        next.status = status;
        next.updated_at = Utc::now();

        self.publish(&snapshot, vec![next.clone()], snapshot.current)?;
        Ok(next)
    }

    /// Commit changed records, then swap in the next snapshot
    ///
    /// Caller must hold the writer lock.
    fn publish(
        &self,
        base: &Snapshot,
        changed: Vec<Scenario>,
        current: Option<ScenarioId>,
    ) -> Result<(), ScenarioError> {
        self.repository.commit(&changed)?;

        let mut scenarios = base.scenarios.clone();
        for scenario in changed {
            scenarios.insert(scenario.id, Arc::new(scenario));
        }
        self.state.store(Arc::new(Snapshot { scenarios, current }));
        Ok(())
    }

    fn next_id(&self) -> ScenarioId {
        let mut generator = self.ids.lock();
        ScenarioId(generator.generate().unwrap_or_else(|_| Ulid::new()))
    }
}

impl std::fmt::Debug for ScenarioStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.state.load();
        f.debug_struct("ScenarioStore")
            .field("scenarios", &snapshot.len())
            .field("current", &snapshot.current_id())
            .field("repository", &self.repository)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn transition_error(scenario: &Scenario, action: LifecycleAction) -> ScenarioError {
    ScenarioError::InvalidTransition {
        id: scenario.id,
        status: scenario.status,
        action,
    }
}

fn normalize_name(name: &str) -> Result<String, ScenarioError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ScenarioError::InvalidRequest(
            "scenario name must not be blank".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn check_comparison_ids(ids: &[ScenarioId]) -> Result<(), ScenarioError> {
    if ids.len() < 2 {
        return Err(ScenarioError::InvalidRequest(
            "comparison needs at least two scenarios".to_string(),
        ));
    }
    for (i, id) in ids.iter().enumerate() {
        if ids[..i].contains(id) {
            return Err(ScenarioError::InvalidRequest(format!(
                "scenario {id} listed more than once"
            )));
        }
    }
    Ok(())
}

/// Put legacy bands in ladder order, rejecting unknown and missing grades
fn align_legacy_grades(
    ladder: &GradeLadder,
    mut grades: GradeMatrix,
) -> Result<GradeMatrix, ScenarioError> {
    let mut errors = ValidationErrors::new();
    for grade in grades.keys().filter(|g| !ladder.contains(g)) {
        errors.push(GradingError::UnknownGrade {
            grade: grade.clone(),
        });
    }

    let mut aligned = GradeMatrix::with_capacity(ladder.len());
    for grade in ladder.ids() {
        match grades.swap_remove(grade) {
            Some(points) if points.is_valid() => {
                aligned.insert(grade.clone(), points);
            }
            Some(points) if points.m.is_finite() && points.m <= 0.0 => {
                errors.push(GradingError::NonPositiveMedian {
                    grade: grade.clone(),
                    median: points.m,
                })
            }
            Some(points) => errors.push(GradingError::InvalidBand {
                grade: grade.clone(),
                points,
            }),
            None => {
                return Err(ScenarioError::InvalidRequest(format!(
                    "legacy matrix has no band for grade '{grade}'"
                )))
            }
        }
    }

    Ok(errors.into_result(aligned)?)
}

/// Whether expanding the band's median with `intervals` lands on the band,
/// allowing one rounding unit per point
fn reproduces_band(
    intervals: GlobalHorizontalIntervals,
    precision: Precision,
    band: &GradePoints,
) -> bool {
    let Ok(calculator) = HorizontalBandCalculator::new(intervals, precision) else {
        return false;
    };
    let expanded = calculator.expand(band.m);
    let tolerance = precision.unit() * 1.5;
    expanded
        .as_array()
        .iter()
        .zip(band.as_array())
        .all(|(a, b)| (a - b).abs() <= tolerance.max(b.abs() * 1e-12))
}

/// Intervals that reproduce a band from its median
fn implied_intervals(
    points: &GradePoints,
) -> Result<GlobalHorizontalIntervals, ScenarioError> {
    let ratio = |upper: f64, lower: f64, field: &str| {
        if lower > 0.0 && upper.is_finite() {
            Ok(upper / lower - 1.0)
        } else {
            Err(ScenarioError::InvalidRequest(format!(
                "cannot imply {field} from the base band"
            )))
        }
    };
    Ok(GlobalHorizontalIntervals {
        ld_to_lq: ratio(points.lq, points.ld, "ld_to_lq")?,
        lq_to_m: ratio(points.m, points.lq, "lq_to_m")?,
        m_to_uq: ratio(points.uq, points.m, "m_to_uq")?,
        uq_to_ud: ratio(points.ud, points.uq, "uq_to_ud")?,
    })
}
