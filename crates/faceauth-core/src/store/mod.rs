//! Persistence for the single enrolled identity.
//!
//! Every backend holds zero or one [`Identity`]. `load` fails open: a missing,
//! unreadable or corrupted backing resource reads as "nothing enrolled" so that
//! status and login stay available. `save` replaces the record atomically and
//! reports failures to the caller.

mod json;
mod memory;
mod sqlite;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::types::Identity;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize identity: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Durable holder of zero or one enrolled identity.
pub trait DescriptorStore: Send + Sync {
    /// Current identity, or `None` if nothing is enrolled or the backing
    /// resource cannot be read. Never fails.
    fn load(&self) -> Option<Identity>;

    /// Replace any existing identity with `identity`.
    ///
    /// Readers observe either the previous record or the new one, never a
    /// partial write.
    fn save(&self, identity: &Identity) -> Result<(), StoreError>;
}

impl<T: DescriptorStore + ?Sized> DescriptorStore for Box<T> {
    fn load(&self) -> Option<Identity> {
        (**self).load()
    }

    fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        (**self).save(identity)
    }
}

impl<T: DescriptorStore + ?Sized> DescriptorStore for Arc<T> {
    fn load(&self) -> Option<Identity> {
        (**self).load()
    }

    fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        (**self).save(identity)
    }
}

/// Which persistence backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

impl StoreBackend {
    /// Default file name for this backend inside the data directory.
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Json => "identity.json",
            Self::Sqlite => "identity.db",
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown store backend '{other}' (expected json or sqlite)")),
        }
    }
}

/// Open the configured backend at `path`.
///
/// Never fails: an unusable backing file reads as "not enrolled" until the
/// next successful `save`.
pub fn open_store(backend: StoreBackend, path: impl Into<PathBuf>) -> Box<dyn DescriptorStore> {
    let path = path.into();
    match backend {
        StoreBackend::Json => Box::new(JsonFileStore::new(path)),
        StoreBackend::Sqlite => Box::new(SqliteStore::open(path)),
    }
}
