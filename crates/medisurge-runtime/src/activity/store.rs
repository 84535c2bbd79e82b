//! Activity store backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use medisurge_types::ActivityLogEntry;
use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use super::query::ActivityQuery;
use crate::config::ActivityConfig;
use crate::error::{ActivityError, ActivityResult};

/// Append-only persistence for activity entries.
///
/// Implementations must accept concurrent appends from every fan-out branch
/// and serve queries while appends are in flight.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;

    /// Append one entry.
    async fn append(&self, entry: &ActivityLogEntry) -> ActivityResult<()>;

    /// Entries matching `query`.
    async fn query(&self, query: &ActivityQuery) -> ActivityResult<Vec<ActivityLogEntry>>;

    /// Number of stored entries.
    async fn count(&self) -> ActivityResult<usize>;
}

/// Build the store described by `config`.
pub async fn open_store(config: &ActivityConfig) -> ActivityResult<Arc<dyn ActivityStore>> {
    match config {
        ActivityConfig::Memory => Ok(Arc::new(MemoryActivityStore::new())),
        ActivityConfig::File { path } => Ok(Arc::new(FileActivityStore::open(path).await?)),
    }
}

/// In-memory storage for development and testing
#[derive(Debug, Default)]
pub struct MemoryActivityStore {
    entries: RwLock<Vec<ActivityLogEntry>>,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored entry in append order.
    pub fn snapshot(&self) -> Vec<ActivityLogEntry> {
        self.entries.read().clone()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, entry: &ActivityLogEntry) -> ActivityResult<()> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    async fn query(&self, query: &ActivityQuery) -> ActivityResult<Vec<ActivityLogEntry>> {
        let entries = self.entries.read().clone();
        Ok(query.apply(entries))
    }

    async fn count(&self) -> ActivityResult<usize> {
        Ok(self.entries.read().len())
    }
}

/// Append-only JSON-lines file, one entry per line.
///
/// Writes are serialised through a mutex so concurrent appends never
/// interleave within a line. Unparseable lines are skipped on read.
#[derive(Debug)]
pub struct FileActivityStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileActivityStore {
    /// Open (creating parent directories if needed) the log at `path`.
    pub async fn open(path: impl AsRef<Path>) -> ActivityResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> ActivityResult<Vec<ActivityLogEntry>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ActivityError::Io(e)),
        };

        let mut entries = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ActivityLogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed activity log line"
                ),
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl ActivityStore for FileActivityStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn append(&self, entry: &ActivityLogEntry) -> ActivityResult<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn query(&self, query: &ActivityQuery) -> ActivityResult<Vec<ActivityLogEntry>> {
        Ok(query.apply(self.read_all().await?))
    }

    async fn count(&self) -> ActivityResult<usize> {
        Ok(self.read_all().await?.len())
    }
}
