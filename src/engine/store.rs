use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::FloorState;
use crate::snapshot::SnapshotFile;

use super::StoreError;

/// Where the floor lives between runs. The engine loads once and commits a
/// full snapshot after every mutation; a commit must be all-or-nothing.
#[async_trait]
pub trait Store: Send + Sync {
    async fn load(&self) -> Result<FloorState, StoreError>;
    async fn commit(&self, state: &FloorState) -> Result<(), StoreError>;
}

/// Keeps the last committed snapshot in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<FloorState>,
    commits: Mutex<u64>,
}

impl InMemoryStore {
    pub fn new(state: FloorState) -> Self {
        Self {
            state: Mutex::new(state),
            commits: Mutex::new(0),
        }
    }

    pub fn committed(&self) -> FloorState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn commit_count(&self) -> u64 {
        *self.commits.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn load(&self) -> Result<FloorState, StoreError> {
        Ok(self.committed())
    }

    async fn commit(&self, state: &FloorState) -> Result<(), StoreError> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state.clone();
        *self.commits.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

/// Snapshot file on local disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    file: SnapshotFile,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: SnapshotFile::new(path),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }
}

#[async_trait]
impl Store for FileStore {
    async fn load(&self) -> Result<FloorState, StoreError> {
        self.file.read().await
    }

    async fn commit(&self, state: &FloorState) -> Result<(), StoreError> {
        let started = std::time::Instant::now();
        let result = self.file.write(state).await;
        metrics::histogram!(crate::observability::STORE_COMMIT_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }
}
