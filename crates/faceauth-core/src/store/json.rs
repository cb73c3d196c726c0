use super::{DescriptorStore, StoreError};
use crate::types::Identity;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Single JSON document on disk holding the enrolled identity.
///
/// Writes go to a uniquely named temp file in the same directory, are synced,
/// then renamed over the target, so concurrent readers see the old or the new
/// document and nothing in between.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "identity.json".to_string());
        let suffix = uuid::Uuid::new_v4().simple();
        self.path
            .with_file_name(format!(".{file_name}.tmp.{}.{suffix}", std::process::id()))
    }
}

impl DescriptorStore for JsonFileStore {
    fn load(&self) -> Option<Identity> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no identity file");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "identity file unreadable; treating as not enrolled");
                return None;
            }
        };

        match serde_json::from_str::<Identity>(&contents) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "identity file corrupted; treating as not enrolled");
                None
            }
        }
    }

    fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }

        let json = serde_json::to_string_pretty(identity)?;
        let temp_path = self.temp_path();

        let written = fs::File::create(&temp_path).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::io(&temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::io(&self.path, e));
        }
        sync_parent_dir(&self.path)?;

        tracing::debug!(path = %self.path.display(), id = %identity.id, "identity written");
        Ok(())
    }
}

/// Flush the directory entry created by the rename.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| StoreError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}
