//! Durable storage for the single `ProgressState` record.
//!
//! The file is replaced atomically: write `<path>.tmp`, fsync it, rename it
//! over `<path>`, fsync the directory. A crash leaves either the old record or
//! the new one, never a torn file. Anything unreadable loads as "no state", so
//! the worst case is a fresh baseline rather than a crash loop.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use tunewatch_common::traits::StateStore;
use tunewatch_common::types::ProgressState;
use tunewatch_common::{Result, WatchError};

/// JSON file-backed state store.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> std::result::Result<Option<ProgressState>, WatchError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(WatchError::StateCorruption(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| WatchError::StateCorruption(e.to_string()))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Option<ProgressState> {
        let store = self.clone();
        let result = tokio::task::spawn_blocking(move || store.read())
            .await
            .unwrap_or_else(|e| Err(WatchError::StateCorruption(e.to_string())));

        match result {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable state file, starting from a fresh baseline"
                );
                None
            }
        }
    }

    async fn save(&self, state: &ProgressState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| WatchError::State(format!("serialize failed: {}", e)))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| WatchError::State(e.to_string()))?
            .map_err(|e| {
                WatchError::State(format!("writing {} failed: {}", self.path.display(), e))
            })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp, path)?;
    File::open(&dir)?.sync_all()
}

/// In-process state store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<ProgressState>>,
}

impl MemoryStateStore {
    pub fn new(initial: Option<ProgressState>) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }

    pub fn snapshot(&self) -> Option<ProgressState> {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Option<ProgressState> {
        self.snapshot()
    }

    async fn save(&self, state: &ProgressState) -> Result<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| WatchError::State("state mutex poisoned".to_string()))?;
        *guard = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn state(marker: &str) -> ProgressState {
        ProgressState {
            version_marker: marker.to_string(),
            watermark: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nested/state.json"));

        store.save(&state("s1")).await.unwrap();
        assert_eq!(store.load().await, Some(state("s1")));

        store.save(&state("s2")).await.unwrap();
        assert_eq!(store.load().await, Some(state("s2")));
        assert!(!dir.path().join("nested/state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_is_human_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        FileStateStore::new(&path).save(&state("s1")).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"version_marker\": \"s1\""));
        assert!(text.contains("2024-05-01T08:30:00Z"));
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{ not json").unwrap();
        assert_eq!(FileStateStore::new(&path).load().await, None);

        std::fs::write(&path, br#"{"watermark": 12}"#).unwrap();
        assert_eq!(FileStateStore::new(&path).load().await, None);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStateStore::default();
        assert_eq!(store.load().await, None);
        store.save(&state("s1")).await.unwrap();
        assert_eq!(store.snapshot(), Some(state("s1")));
    }
}
