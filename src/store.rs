//! Persistence store for gentask
//!
//! The application state lives in two logical documents, "tasks" and
//! "projects". They are loaded once at startup and rewritten in full after
//! every mutation; there are no partial updates. The [`Store`] trait keeps
//! the rest of the crate independent of the backing medium.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::models::{Project, Task};

/// File name of the tasks document under the data directory.
pub const TASKS_DOCUMENT: &str = "tasks.json";

/// File name of the projects document under the data directory.
pub const PROJECTS_DOCUMENT: &str = "projects.json";

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed store document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Durable key-value storage for the two application documents.
///
/// `load_*` returns `Ok(None)` when a document has never been written;
/// callers substitute defaults. `save_*` overwrites the whole document.
pub trait Store: Send + Sync {
    fn load_tasks(&self) -> Result<Option<Vec<Task>>, StoreError>;
    fn load_projects(&self) -> Result<Option<Vec<Project>>, StoreError>;
    fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError>;
    fn save_projects(&self, projects: &[Project]) -> Result<(), StoreError>;
}

/// JSON documents in a data directory, replaced atomically on save.
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    tasks_path: PathBuf,
    projects_path: PathBuf,
}

impl JsonFileStore {
    /// Opens (creating if needed) the data directory.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir)?;

        let store = Self {
            data_dir: data_dir.to_path_buf(),
            tasks_path: data_dir.join(TASKS_DOCUMENT),
            projects_path: data_dir.join(PROJECTS_DOCUMENT),
        };
        info!(data_dir = %store.data_dir.display(), "opened document store");
        Ok(store)
    }

    fn load_document<T: DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<Option<Vec<T>>, StoreError> {
        if !path.exists() {
            debug!(file = %path.display(), "document absent");
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let items = serde_json::from_str(&raw)?;
        Ok(Some(items))
    }

    // Write to a temp file in the same directory, then rename over the
    // document so readers never observe a torn write.
    fn save_document<T: Serialize>(&self, path: &Path, items: &[T]) -> Result<(), StoreError> {
        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        serde_json::to_writer_pretty(&mut temp, items)?;
        temp.flush()?;
        temp.persist(path).map_err(|err| StoreError::Io(err.error))?;

        debug!(file = %path.display(), count = items.len(), "saved document");
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn load_tasks(&self) -> Result<Option<Vec<Task>>, StoreError> {
        self.load_document(&self.tasks_path)
    }

    fn load_projects(&self) -> Result<Option<Vec<Project>>, StoreError> {
        self.load_document(&self.projects_path)
    }

    fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.save_document(&self.tasks_path, tasks)
    }

    fn save_projects(&self, projects: &[Project]) -> Result<(), StoreError> {
        self.save_document(&self.projects_path, projects)
    }
}

/// In-process store for tests and `--ephemeral` serving. Documents start
/// absent, exactly like a first run against an empty data directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<Option<Vec<Task>>>,
    projects: Mutex<Option<Vec<Project>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Store for MemoryStore {
    fn load_tasks(&self) -> Result<Option<Vec<Task>>, StoreError> {
        Ok(lock_or_recover(&self.tasks).clone())
    }

    fn load_projects(&self) -> Result<Option<Vec<Project>>, StoreError> {
        Ok(lock_or_recover(&self.projects).clone())
    }

    fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        *lock_or_recover(&self.tasks) = Some(tasks.to_vec());
        Ok(())
    }

    fn save_projects(&self, projects: &[Project]) -> Result<(), StoreError> {
        *lock_or_recover(&self.projects) = Some(projects.to_vec());
        Ok(())
    }
}
