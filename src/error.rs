//! Error types surfaced by the engine.

use thiserror::Error;

/// Failures a caller of [`crate::engine::ContextEngine`] can observe.
///
/// Every top-level operation is total: given valid input it returns a
/// result or one of these named failures. Signal unavailability is never
/// an error; it degrades to a zero signal with a reason annotation.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Rejected before any state is written.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The session id is unknown or belongs to a different project root.
    #[error("unknown session: {0}")]
    UnknownSession(i64),

    /// The store file could not be opened or initialized.
    #[error("cannot open store: {0}")]
    StoreOpen(String),

    /// The override store stayed busy past the bounded retries.
    #[error("storage contention after {attempts} attempts")]
    StorageContention { attempts: u32 },

    /// The search index collaborator failed.
    #[error("search index error: {0}")]
    Index(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScoutError>;
