use super::{DescriptorStore, StoreError};
use crate::types::{FaceDescriptor, Identity};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

// One-slot table: the CHECK pins every row to slot 0, so at most one
// identity can exist.
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS identity (
        slot          INTEGER PRIMARY KEY CHECK (slot = 0),
        id            TEXT NOT NULL,
        display_name  TEXT NOT NULL,
        descriptor    TEXT NOT NULL,
        enrolled_at   TEXT NOT NULL
    );
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DATE_FORMAT: &str = "%Y%m%d_%H%M%S";

/// SQLite-backed identity store.
///
/// The connection is opened lazily and dropped after any failure, so a
/// missing or corrupted database file never prevents construction: reads
/// report "not enrolled" and the next `save` rebuilds the file, moving a
/// corrupted one aside first.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

fn connect(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

fn is_not_a_database(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::NotADatabase
    )
}

impl SqliteStore {
    /// Create a store for the database at `path`.
    ///
    /// Connects immediately when possible; failures are logged and retried on
    /// the next operation.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let conn = if path.parent().map_or(true, |d| d.as_os_str().is_empty() || d.exists()) {
            match connect(&path) {
                Ok(conn) => {
                    tracing::debug!(path = %path.display(), "sqlite identity store opened");
                    Some(conn)
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "sqlite identity store unavailable; treating as not enrolled");
                    None
                }
            }
        } else {
            None
        };

        Self {
            path,
            conn: Mutex::new(conn),
        }
    }

    /// Connect for a write: create parent directories, and replace a file
    /// that is not a database.
    fn connect_for_write(&self) -> Result<Connection, StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }

        match connect(&self.path) {
            Ok(conn) => Ok(conn),
            Err(e) if is_not_a_database(&e) => {
                let backup = self.backup_corrupted()?;
                tracing::warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    "moved corrupted identity database aside"
                );
                Ok(connect(&self.path)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rename the database to `<name>.corrupted.<timestamp>`.
    fn backup_corrupted(&self) -> Result<PathBuf, StoreError> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "identity.db".to_string());
        let timestamp = Utc::now().format(DATE_FORMAT);
        let backup = self
            .path
            .with_file_name(format!("{file_name}.corrupted.{timestamp}"));
        std::fs::rename(&self.path, &backup).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(backup)
    }

    fn read(conn: &Connection) -> Result<Option<Identity>, String> {
        let row = conn
            .query_row(
                "SELECT id, display_name, descriptor, enrolled_at FROM identity WHERE slot = 0",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| e.to_string())?;

        let Some((id, display_name, descriptor, enrolled_at)) = row else {
            return Ok(None);
        };

        let id = id.parse::<uuid::Uuid>().map_err(|e| format!("bad id: {e}"))?;
        let descriptor: FaceDescriptor =
            serde_json::from_str(&descriptor).map_err(|e| format!("bad descriptor: {e}"))?;
        let enrolled_at = DateTime::parse_from_rfc3339(&enrolled_at)
            .map_err(|e| format!("bad timestamp: {e}"))?
            .with_timezone(&Utc);

        Ok(Some(Identity {
            id,
            display_name,
            descriptor,
            enrolled_at,
        }))
    }

    fn write(conn: &mut Connection, identity: &Identity) -> Result<(), StoreError> {
        let descriptor = serde_json::to_string(&identity.descriptor)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO identity (slot, id, display_name, descriptor, enrolled_at)
             VALUES (0, ?1, ?2, ?3, ?4)",
            params![
                identity.id.to_string(),
                identity.display_name,
                descriptor,
                identity.enrolled_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl DescriptorStore for SqliteStore {
    fn load(&self) -> Option<Identity> {
        let Ok(mut slot) = self.conn.lock() else {
            tracing::warn!(path = %self.path.display(), "store lock poisoned; treating as not enrolled");
            return None;
        };

        let conn = match slot.take() {
            Some(conn) => slot.insert(conn),
            None => match connect(&self.path) {
                Ok(conn) => slot.insert(conn),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "identity database unreadable; treating as not enrolled");
                    return None;
                }
            },
        };

        match Self::read(conn) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "identity row unreadable; treating as not enrolled");
                *slot = None;
                None
            }
        }
    }

    fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut slot = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

        let conn = match slot.take() {
            Some(conn) => slot.insert(conn),
            None => slot.insert(self.connect_for_write()?),
        };

        if let Err(e) = Self::write(conn, identity) {
            *slot = None;
            return Err(e);
        }

        tracing::debug!(path = %self.path.display(), id = %identity.id, "identity row written");
        Ok(())
    }
}
