use log::{info, warn};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::db::{FileStorage, MemoryStorage, PollStorage, SqliteStorage};
use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    File,
    Sqlite,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "file" => Ok(StorageKind::File),
            "sqlite" => Ok(StorageKind::Sqlite),
            other => Err(format!("unknown storage backend {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub base_url: String,
    pub storage: StorageKind,
    pub storage_path: PathBuf,
    pub database_url: String,
}

impl Config {
    /// Reads the process environment.
    pub fn load() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let port: u16 = parse_or_default(&lookup, "PORT", "8080")?;
        let base_url = lookup("BASE_URL").unwrap_or_else(|| format!("http://localhost:{}/", port));

        Ok(Self {
            port,
            base_url,
            storage: parse_or_default(&lookup, "STORAGE", "sqlite")?,
            storage_path: parse_or_default(&lookup, "STORAGE_PATH", "polls.json")?,
            database_url: parse_or_default(&lookup, "DATABASE_URL", "sqlite:trusty_poll.db")?,
        })
    }

    pub async fn open_storage(&self) -> Result<Arc<dyn PollStorage>, StorageError> {
        let storage: Arc<dyn PollStorage> = match self.storage {
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
            StorageKind::File => Arc::new(FileStorage::open(&self.storage_path).await?),
            StorageKind::Sqlite => Arc::new(SqliteStorage::connect(&self.database_url).await?),
        };
        Ok(storage)
    }
}

fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    });
    raw.parse().map_err(|e| {
        warn!("Invalid {} value: {}", key, e);
        format!("{}: {}", key, e)
    })
}
