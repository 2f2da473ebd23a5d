//! Project record persistence
//!
//! The whole record is one JSON document, read in full and rewritten in full.
//! There is a single writer; the last save wins.
//!
//! Global invariants enforced:
//! - `load` never fails; an unreadable document yields an empty record
//! - `save` replaces the document atomically (temp file + rename)
//! - Migration runs on every load, is idempotent and never removes data

use crate::error::StorageError;
use crate::index::CriterionIndex;
use crate::layout;
use crate::record::{Criterion, ProjectRecord, CRITERIA_COUNT};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the record inside the data directory
pub const PROJECT_FILE: &str = "project.json";

/// Where the serialized document lives
pub trait Backend {
    /// The stored document, `None` if nothing has been saved yet
    fn read(&self) -> Result<Option<String>, StorageError>;

    fn write(&mut self, contents: &str) -> Result<(), StorageError>;

    /// Whether writes can reach durable storage
    fn is_durable(&self) -> bool;

    /// Human-readable location for messages
    fn describe(&self) -> String;
}

/// Stores the document in a single file
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBackend { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for FileBackend {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Unavailable {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&mut self, contents: &str) -> Result<(), StorageError> {
        atomic_write(&self.path, contents).map_err(|source| StorageError::Unavailable {
            path: self.path.clone(),
            source,
        })
    }

    fn is_durable(&self) -> bool {
        if self.path.is_dir() {
            return false;
        }
        // The nearest existing ancestor must accept writes
        let mut dir = self.path.parent();
        while let Some(candidate) = dir {
            let candidate = if candidate.as_os_str().is_empty() {
                Path::new(".")
            } else {
                candidate
            };
            if let Ok(meta) = fs::metadata(candidate) {
                return meta.is_dir() && !meta.permissions().readonly();
            }
            dir = candidate.parent();
        }
        false
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Session-only storage; nothing survives the process
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    contents: Option<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document
    pub fn with_contents(contents: &str) -> Self {
        MemoryBackend {
            contents: Some(contents.to_string()),
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Backend for MemoryBackend {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> Result<(), StorageError> {
        self.contents = Some(contents.to_string());
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Write via temp file and rename so a crash never leaves a partial document.
///
/// The temp file is removed when the rename fails.
pub fn atomic_write(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        e
    })
}

/// Add the fifth criterion to a record saved when there were only four.
///
/// Applies only when criterion 4 has a label and criterion 5 is absent.
/// Returns true if the record changed.
pub fn migrate(record: &mut ProjectRecord) -> bool {
    let fourth = CriterionIndex::new(4).and_then(|i| record.criterion(i));
    let fifth_absent = record.criteria[CRITERIA_COUNT as usize - 1].is_none();
    if !matches!(fourth, Some(c) if !c.is_blank()) || !fifth_absent {
        return false;
    }
    record.criteria[CRITERIA_COUNT as usize - 1] = Some(Criterion::default());
    record.num_criteria = Some(CRITERIA_COUNT);
    tracing::info!("migrated record to {} criteria", CRITERIA_COUNT);
    true
}

/// Loads and saves the one project record
#[derive(Debug)]
pub struct ProjectStore<B: Backend> {
    backend: B,
}

impl ProjectStore<FileBackend> {
    /// File-backed store at `<data_dir>/project.json`
    pub fn open(data_dir: &Path) -> Self {
        ProjectStore::new(FileBackend::new(data_dir.join(PROJECT_FILE)))
    }
}

impl ProjectStore<MemoryBackend> {
    pub fn in_memory() -> Self {
        ProjectStore::new(MemoryBackend::new())
    }
}

impl<B: Backend> ProjectStore<B> {
    pub fn new(backend: B) -> Self {
        ProjectStore { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_durable(&self) -> bool {
        self.backend.is_durable()
    }

    /// Load and migrate, reporting storage problems
    pub fn try_load(&self) -> Result<ProjectRecord, StorageError> {
        let Some(contents) = self.backend.read()? else {
            tracing::debug!(location = %self.backend.describe(), "no stored record, starting empty");
            return Ok(ProjectRecord::new());
        };

        let document = match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(StorageError::Corrupt {
                    path: PathBuf::from(self.backend.describe()),
                    reason: "not a JSON object".to_string(),
                })
            }
            Err(e) => {
                return Err(StorageError::Corrupt {
                    path: PathBuf::from(self.backend.describe()),
                    reason: e.to_string(),
                })
            }
        };

        let mut record = layout::decode(&document);
        migrate(&mut record);
        tracing::debug!(location = %self.backend.describe(), "record loaded");
        Ok(record)
    }

    /// Load the record, falling back to an empty one on any storage problem
    pub fn load(&self) -> ProjectRecord {
        self.try_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "starting from an empty record");
            ProjectRecord::new()
        })
    }

    /// Overwrite the stored document with `record`
    pub fn save(&mut self, record: &ProjectRecord) -> Result<(), StorageError> {
        let document = Value::Object(layout::encode(record));
        let mut contents = format!("{:#}", document);
        contents.push('\n');
        self.backend.write(&contents)?;
        tracing::debug!(location = %self.backend.describe(), "record saved");
        Ok(())
    }
}
