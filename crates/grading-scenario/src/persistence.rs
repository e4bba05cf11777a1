//! Durable storage for scenario records
//!
//! The store publishes a change only after its repository has committed it,
//! so a failed write leaves readers on the previous state.

use crate::error::PersistenceError;
use crate::types::{Scenario, ScenarioId, ScenarioStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Storage seam for scenario records
pub trait ScenarioRepository: Debug + Send + Sync {
    /// Every stored scenario
    ///
    /// # Errors
    /// Returns error if the backing store cannot be read
    fn load_all(&self) -> Result<Vec<Scenario>, PersistenceError>;

    /// Persist a set of changed scenarios as one unit
    ///
    /// Either all records are written or none are.
    ///
    /// # Errors
    /// Returns error if the backing store cannot be written
    fn commit(&self, changed: &[Scenario]) -> Result<(), PersistenceError>;
}

/// Process-local repository
#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: Mutex<BTreeMap<ScenarioId, Scenario>>,
}

impl MemoryRepository {
    /// Create empty repository
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True when nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ScenarioRepository for MemoryRepository {
    fn load_all(&self) -> Result<Vec<Scenario>, PersistenceError> {
        Ok(self.records.lock().values().cloned().collect())
    }

    fn commit(&self, changed: &[Scenario]) -> Result<(), PersistenceError> {
        let mut records = self.records.lock();
        for scenario in changed {
            records.insert(scenario.id, scenario.clone());
        }
        Ok(())
    }
}

/// On-disk document layout
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    scenarios: Vec<Scenario>,
}

const DOCUMENT_VERSION: u32 = 1;

/// Whole-store JSON file
///
/// Each commit rewrites the document into a sibling temp file and renames it
/// over the original.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    records: Mutex<BTreeMap<ScenarioId, Scenario>>,
}

impl JsonFileRepository {
    /// Open a file, reading it when it exists
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or decoded
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let records = if path.exists() {
            read_document(&path)?
                .scenarios
                .into_iter()
                .map(|s| (s.id, s))
                .collect()
        } else {
            BTreeMap::new()
        };

        tracing::debug!("opened scenario file {} ({} records)", path.display(), records.len());

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Backing file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScenarioRepository for JsonFileRepository {
    fn load_all(&self) -> Result<Vec<Scenario>, PersistenceError> {
        Ok(self.records.lock().values().cloned().collect())
    }

    fn commit(&self, changed: &[Scenario]) -> Result<(), PersistenceError> {
        let mut records = self.records.lock();

        let mut next = records.clone();
        for scenario in changed {
            next.insert(scenario.id, scenario.clone());
        }

        write_document(
            &self.path,
            &StoreDocument {
                version: DOCUMENT_VERSION,
                scenarios: next.values().cloned().collect(),
            },
        )?;

        *records = next;
        Ok(())
    }
}

fn read_document(path: &Path) -> Result<StoreDocument, PersistenceError> {
    let bytes = std::fs::read(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: StoreDocument = serde_json::from_slice(&bytes)?;
    if document.version != DOCUMENT_VERSION {
        return Err(PersistenceError::Corrupt(format!(
            "unsupported document version {} in {}",
            document.version,
            path.display()
        )));
    }
    Ok(document)
}

fn write_document(path: &Path, document: &StoreDocument) -> Result<(), PersistenceError> {
    let bytes = serde_json::to_vec_pretty(document)?;
    let tmp = path.with_extension("json.tmp");
    let io_err = |source| PersistenceError::Io {
        path: tmp.clone(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut file = File::create(&tmp).map_err(io_err)?;
    file.write_all(&bytes).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);
    std::fs::rename(&tmp, path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Checks loaded records against the single-current invariant and for a
/// band on every ladder grade
///
/// # Errors
/// Returns `PersistenceError::Corrupt` when more than one record is current
/// or a record lacks a band for one of its grades
pub fn check_loaded(records: &[Scenario]) -> Result<Option<ScenarioId>, PersistenceError> {
    for scenario in records {
        if let Some(grade) = scenario.ladder.ids().iter().find(|g| scenario.points(g).is_none()) {
            return Err(PersistenceError::Corrupt(format!(
                "scenario {} has no band for grade '{grade}'",
                scenario.id
            )));
        }
    }

    let mut current = records.iter().filter(|s| s.status == ScenarioStatus::Current);
    let first = current.next().map(|s| s.id);
    if let Some(second) = current.next() {
        return Err(PersistenceError::Corrupt(format!(
            "scenarios {} and {} are both CURRENT",
            first.map(|id| id.to_string()).unwrap_or_default(),
            second.id
        )));
    }
    Ok(first)
}
