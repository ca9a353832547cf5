//! Persistence adapters for the library store.
//!
//! # Responsibility
//! - Define the load/save contract between the store and its backing form.
//! - Isolate SQL and file-format details from service orchestration.
//!
//! # Invariants
//! - `load` tolerates an empty/missing source by returning the default store.
//! - `save` persists the whole store; a failed save leaves the previous
//!   persisted state intact.

use crate::db::DbError;
use crate::store::Store;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod json_repo;
pub mod sqlite_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for catalog persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Another stored book already carries this title.
    DuplicateTitle(String),
    /// Title-keyed row operation targeted a book that is not stored.
    BookNotFound(String),
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::DuplicateTitle(title) => {
                write!(f, "another stored book is already titled `{title}`")
            }
            Self::BookNotFound(title) => write!(f, "stored book not found: `{title}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::DuplicateTitle(_) | Self::BookNotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Backing-store contract for the library store.
pub trait LibraryRepository {
    /// Loads the whole store, falling back to the default library set.
    fn load(&self) -> RepoResult<Store>;
    /// Persists the whole store.
    fn save(&mut self, store: &Store) -> RepoResult<()>;
}
