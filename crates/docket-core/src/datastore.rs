use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::Task;

/// Key the task collection is stored under.
pub const TASKS_KEY: &str = "tasks";

/// Durable home of the task collection. The whole collection is loaded and
/// saved as one blob.
pub trait TaskStore {
    /// `Ok(vec![])` when nothing has been saved yet.
    fn load(&self) -> anyhow::Result<Vec<Task>>;

    fn save(&self, tasks: &[Task]) -> anyhow::Result<()>;
}

impl<T: TaskStore + ?Sized> TaskStore for &T {
    fn load(&self) -> anyhow::Result<Vec<Task>> {
        (**self).load()
    }

    fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        (**self).save(tasks)
    }
}

/// Key-value blob store backed by a directory, one `<key>.json` file per key.
#[derive(Debug)]
pub struct BlobStore {
    pub data_dir: PathBuf,
}

impl BlobStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened blob store");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }

    #[tracing::instrument(skip(self))]
    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(file = %path.display(), "no blob stored");
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, value))]
    pub fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), bytes = value.len(), "writing blob atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }

    /// Moves an unreadable blob aside so the next save does not clobber it.
    fn quarantine(&self, key: &str) {
        let path = self.path_for(key);
        let target = self.data_dir.join(format!("{key}.json.corrupt"));
        match fs::rename(&path, &target) {
            Ok(()) => warn!(
                file = %path.display(),
                moved_to = %target.display(),
                "moved unreadable blob aside"
            ),
            Err(err) => warn!(
                file = %path.display(),
                error = %err,
                "failed to move unreadable blob aside"
            ),
        }
    }
}

impl TaskStore for BlobStore {
    #[tracing::instrument(skip(self))]
    fn load(&self) -> anyhow::Result<Vec<Task>> {
        let Some(raw) = self.get(TASKS_KEY)? else {
            return Ok(vec![]);
        };
        if raw.trim().is_empty() {
            return Ok(vec![]);
        }

        match decode_tasks(&raw) {
            Ok(tasks) => {
                debug!(count = tasks.len(), "loaded tasks");
                Ok(tasks)
            }
            Err(err) => {
                self.quarantine(TASKS_KEY);
                Err(err.context(format!("failed to decode {}", self.path_for(TASKS_KEY).display())))
            }
        }
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let blob = encode_tasks(tasks)?;
        self.put(TASKS_KEY, &blob)
            .with_context(|| format!("failed to save {TASKS_KEY}"))
    }
}

/// In-process blob store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.blobs.lock().get(key).cloned()
    }

    pub fn put(&self, key: &str, value: impl Into<String>) {
        self.blobs.lock().insert(key.to_string(), value.into());
    }
}

impl TaskStore for MemoryStore {
    fn load(&self) -> anyhow::Result<Vec<Task>> {
        match self.get(TASKS_KEY) {
            Some(raw) => decode_tasks(&raw),
            None => Ok(vec![]),
        }
    }

    fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let blob = encode_tasks(tasks)?;
        self.put(TASKS_KEY, blob);
        Ok(())
    }
}

pub fn encode_tasks(tasks: &[Task]) -> anyhow::Result<String> {
    serde_json::to_string(tasks).context("failed to encode tasks")
}

pub fn decode_tasks(raw: &str) -> anyhow::Result<Vec<Task>> {
    serde_json::from_str(raw).context("failed to decode tasks")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_starts_empty() {
        let store = MemoryStore::new();
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn blob_store_quarantines_corrupt_data() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = BlobStore::open(temp.path()).expect("open store");
        store.put(TASKS_KEY, "{not json").expect("put");

        assert!(store.load().is_err());
        assert!(!store.path_for(TASKS_KEY).exists());
        assert!(temp.path().join("tasks.json.corrupt").exists());
        assert!(store.load().expect("load after quarantine").is_empty());
    }
}
