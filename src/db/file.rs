use async_trait::async_trait;
use log::info;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;

use super::{Lookup, PollStorage, StorageResult};
use crate::error::StorageError;

/// A single JSON document on local disk holding every key.
///
/// The whole document is rewritten on each `put`, through a temporary file
/// and a rename so a crash never leaves a half-written file behind.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} does not exist yet, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let serialized = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serialized).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PollStorage for FileStorage {
    async fn ready(&self) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => return Ok(()),
        };
        if tokio::fs::try_exists(dir).await? {
            Ok(())
        } else {
            Err(StorageError::Unavailable(format!(
                "directory {} does not exist",
                dir.display()
            )))
        }
    }

    async fn load_all(&self, prefix: &str) -> StorageResult<Vec<(String, String)>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn get(&self, key: &str) -> Lookup<String> {
        match self.entries.lock().await.get(key) {
            Some(value) => Lookup::Found(value.clone()),
            None => Lookup::Missing,
        }
    }

    async fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&entries).await {
            // Keep the mirror identical to what is on disk.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polls.json");

        let storage = FileStorage::open(&path).await.unwrap();
        storage.ready().await.unwrap();
        storage.put("poll:1", "{\"x\":1}").await.unwrap();
        storage.put("poll:1", "{\"x\":2}").await.unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("poll:1").await.found().as_deref(),
            Some("{\"x\":2}")
        );
        assert_eq!(reopened.load_all("poll:").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polls.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileStorage::open(&path).await;
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn missing_directory_is_not_ready_and_put_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone").join("polls.json");

        let storage = FileStorage::open(&path).await.unwrap();
        assert!(matches!(
            storage.ready().await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(storage.put("poll:1", "{}").await.is_err());
        assert!(matches!(storage.get("poll:1").await, Lookup::Missing));
    }
}
