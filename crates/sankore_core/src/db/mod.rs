//! Catalog database bootstrap.
//!
//! # Responsibility
//! - Open SQLite connections for the book catalog and bring their schema
//!   up to date.
//! - Verify that a connection carries every catalog table before the
//!   repository touches it.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - Catalog rows are never read or written on a connection whose schema
//!   check failed.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Parent directory of the catalog file could not be created.
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    /// File was written by a newer release.
    SchemaTooNew { found: u32, supported: u32 },
    /// Connection was never migrated, or only partially.
    SchemaBehind { expected: u32, found: u32 },
    /// A catalog table is absent despite a current schema version.
    MissingTable(&'static str),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::CreateDir { dir, source } => write!(
                f,
                "cannot create catalog directory `{}`: {source}",
                dir.display()
            ),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "catalog file uses schema {found}; this build reads up to {supported}"
            ),
            Self::SchemaBehind { expected, found } => write!(
                f,
                "catalog schema is at version {found}, expected {expected}; open it with open_db"
            ),
            Self::MissingTable(table) => write!(f, "catalog table `{table}` is missing"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::CreateDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
