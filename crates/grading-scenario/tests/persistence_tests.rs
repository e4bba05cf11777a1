//! Repository round trips and failure handling

use grading_scenario::prelude::*;
use grading_scenario::{
    JsonFileRepository, MemoryRepository, PersistenceError, ScenarioRepository,
};
use grading_test_utils::{assert_relative, grade, two_grade_input, two_grade_ladder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn json_store(path: &std::path::Path) -> ScenarioStore {
    let repository = JsonFileRepository::open(path).unwrap();
    ScenarioStore::open(Arc::new(repository), EngineConfig::default()).unwrap()
}

fn new_draft(name: &str) -> NewScenario {
    NewScenario::new(two_grade_input()).with_name(name)
}

#[test]
fn test_json_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenarios.json");

    let (applied, drafted) = {
        let store = json_store(&path);
        let a = store.create_draft(two_grade_ladder(), new_draft("a")).unwrap();
        let b = store.create_draft(two_grade_ladder(), new_draft("b")).unwrap();
        store.apply_as_current(a.id).unwrap();
        (a.id, b.id)
    };
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = json_store(&path);
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.current().map(|s| s.id), Some(applied));
    let draft = reopened.get(drafted).unwrap();
    assert_eq!(draft.status, ScenarioStatus::Draft);
    assert_eq!(draft.name, "b");
    assert_eq!(draft.medians.len(), 2);
}

#[test]
fn test_overflowing_draft_is_rejected_and_file_stays_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenarios.json");
    let store = json_store(&path);
    let kept = store.create_draft(two_grade_ladder(), new_draft("kept")).unwrap();

    let mut input = two_grade_input();
    input.base_value = 1e308;
    input.intervals = GlobalHorizontalIntervals::uniform(1.0);
    let err = store
        .create_draft(two_grade_ladder(), NewScenario::new(input).with_name("huge"))
        .unwrap_err();
    assert!(matches!(err, ScenarioError::Validation(_)));
    assert_eq!(store.len(), 1);

    let reopened = json_store(&path);
    assert_eq!(reopened.len(), 1);
    assert!(reopened.get(kept.id).is_some());
}

#[test]
fn test_large_finite_draft_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenarios.json");

    let mut input = two_grade_input();
    input.base_value = 1e307;
    let id = json_store(&path)
        .create_draft(two_grade_ladder(), NewScenario::new(input).with_name("large"))
        .unwrap()
        .id;

    let reopened = json_store(&path);
    let base = reopened.get(id).unwrap().points(&grade("Base")).copied().unwrap();
    assert_relative(base.m, 1e307, 1e-12);
    assert!(base.is_valid());
}

#[test]
fn test_from_config_uses_data_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("scenarios.json");
    let config = EngineConfig::default().with_data_path(&path);

    let id = {
        let store = ScenarioStore::from_config(config.clone()).unwrap();
        store.create_draft(two_grade_ladder(), new_draft("a")).unwrap().id
    };

    let store = ScenarioStore::from_config(config).unwrap();
    assert!(store.get(id).is_some());
}

#[test]
fn test_open_rejects_two_current_records() {
    let seed = ScenarioStore::in_memory(EngineConfig::default()).unwrap();
    let a = seed.create_draft(two_grade_ladder(), new_draft("a")).unwrap();
    let a = seed.apply_as_current(a.id).unwrap();
    let mut b = a.clone();
    b.id = ScenarioId::new();

    let repository = Arc::new(MemoryRepository::new());
    repository.commit(&[a, b]).unwrap();

    let err = ScenarioStore::open(repository, EngineConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        ScenarioError::Persistence(PersistenceError::Corrupt(_))
    ));
}

#[test]
fn test_open_rejects_record_missing_a_band() {
    let seed = ScenarioStore::in_memory(EngineConfig::default()).unwrap();
    let mut a = seed.create_draft(two_grade_ladder(), new_draft("a")).unwrap();
    a.grades.shift_remove(&grade("Senior"));

    let repository = Arc::new(MemoryRepository::new());
    repository.commit(&[a]).unwrap();

    let err = ScenarioStore::open(repository, EngineConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        ScenarioError::Persistence(PersistenceError::Corrupt(_))
    ));
}

#[test]
fn test_open_rejects_garbage_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenarios.json");
    std::fs::write(&path, b"{not json").unwrap();

    assert!(matches!(
        JsonFileRepository::open(&path),
        Err(PersistenceError::Serialization(_))
    ));
}

/// Repository that can be told to reject writes
#[derive(Debug, Default)]
struct FlakyRepository {
    inner: MemoryRepository,
    failing: AtomicBool,
}

impl ScenarioRepository for FlakyRepository {
    fn load_all(&self) -> Result<Vec<Scenario>, PersistenceError> {
        self.inner.load_all()
    }

    fn commit(&self, changed: &[Scenario]) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Corrupt("disk full".to_string()));
        }
        self.inner.commit(changed)
    }
}

#[test]
fn test_failed_commit_leaves_state_unchanged() {
    let repository = Arc::new(FlakyRepository::default());
    let store = ScenarioStore::open(repository.clone(), EngineConfig::default()).unwrap();
    let a = store.create_draft(two_grade_ladder(), new_draft("a")).unwrap();
    let b = store.create_draft(two_grade_ladder(), new_draft("b")).unwrap();
    store.apply_as_current(a.id).unwrap();
    let before = store.snapshot();

    repository.failing.store(true, Ordering::SeqCst);
    let err = store.apply_as_current(b.id).unwrap_err();
    assert!(matches!(err, ScenarioError::Persistence(_)));
    assert!(store
        .create_draft(two_grade_ladder(), new_draft("c"))
        .is_err());

    let after = store.snapshot();
    assert_eq!(after.len(), before.len());
    assert_eq!(after.current_id(), Some(a.id));
    assert_eq!(after.get(&b.id).unwrap().status, ScenarioStatus::Draft);

    repository.failing.store(false, Ordering::SeqCst);
    store.apply_as_current(b.id).unwrap();
    assert_eq!(store.get(a.id).unwrap().status, ScenarioStatus::Archived);
    assert_eq!(repository.inner.len(), 2);
}
