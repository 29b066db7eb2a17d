//! Durable state: the session ledger, the override learning store, and
//! the file relationship cache, all backed by one SQLite database.
//!
//! The store is the single shared-mutable resource of the engine.
//! Mutation of a pattern key is a read-modify-write executed inside a
//! transaction while holding the connection lock, so concurrent callers
//! never lose an update; busy errors are retried a bounded number of
//! times before surfacing as [`ScoutError::StorageContention`].

pub mod overrides;
pub mod schema;
pub mod sessions;

use crate::config::LearningConfig;
use crate::error::{Result, ScoutError};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const BUSY_RETRIES: u32 = 3;
const BUSY_BACKOFF: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct ScoutStore {
    conn: Mutex<Connection>,
    project_root: String,
    learning: LearningConfig,
}

impl ScoutStore {
    pub fn open(db_path: &Path, project_root: &str, learning: LearningConfig) -> Result<Self> {
        let conn = schema::open_or_create(db_path)
            .map_err(|e| ScoutError::StoreOpen(format!("{e:#}")))?;
        Ok(Self { conn: Mutex::new(conn), project_root: project_root.to_string(), learning })
    }

    pub fn open_in_memory(project_root: &str, learning: LearningConfig) -> Result<Self> {
        let conn = schema::open_in_memory()
            .map_err(|e| ScoutError::StoreOpen(format!("{e:#}")))?;
        Ok(Self { conn: Mutex::new(conn), project_root: project_root.to_string(), learning })
    }

    pub fn project_root(&self) -> &str {
        &self.project_root
    }

    pub(crate) fn learning(&self) -> &LearningConfig {
        &self.learning
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        // A poisoned mutex means another thread panicked mid-write; the
        // transaction it held has rolled back, so the data is consistent.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `op` with bounded retries on SQLITE_BUSY/LOCKED.
    pub(crate) fn with_retry<T>(&self, mut op: impl FnMut(&mut Connection) -> rusqlite::Result<T>) -> Result<T> {
        let mut conn = self.lock();
        for attempt in 0..=BUSY_RETRIES {
            match op(&mut conn) {
                Ok(value) => return Ok(value),
                Err(e) if is_busy(&e) && attempt < BUSY_RETRIES => {
                    tracing::debug!("store busy, retrying (attempt {})", attempt + 1);
                    std::thread::sleep(BUSY_BACKOFF);
                }
                Err(e) if is_busy(&e) => {
                    return Err(ScoutError::StorageContention { attempts: BUSY_RETRIES + 1 })
                }
                Err(e) => return Err(e.into()),
            }
        }
        unreachable!("retry loop always returns")
    }
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::DatabaseBusy
                || err.code == rusqlite::ErrorCode::DatabaseLocked
    )
}
