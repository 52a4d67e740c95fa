//! Persistence backends for polls.
//!
//! Every backend is a plain key/value store: keys look like `poll:<id>` and
//! values are the JSON encoding of a [`Poll`](crate::models::Poll). The store
//! never relies on anything beyond the [`PollStorage`] contract.

mod file;
mod memory;
mod sqlite;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use async_trait::async_trait;

use crate::error::StorageError;

pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of a single-key lookup.
///
/// Kept as three explicit cases so callers have to decide what an unreachable
/// backend means for them instead of folding it into "not found".
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    Missing,
    Unavailable(StorageError),
}

#[cfg(test)]
impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<StorageResult<Option<T>>> for Lookup<T> {
    fn from(result: StorageResult<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Lookup::Found(value),
            Ok(None) => Lookup::Missing,
            Err(e) => Lookup::Unavailable(e),
        }
    }
}

#[async_trait]
pub trait PollStorage: Send + Sync {
    /// Resolves once the backend can serve requests.
    async fn ready(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Every `(key, value)` pair whose key starts with `prefix`.
    async fn load_all(&self, prefix: &str) -> StorageResult<Vec<(String, String)>>;

    async fn get(&self, key: &str) -> Lookup<String>;

    /// Insert or fully overwrite `key`.
    async fn put(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;
}
