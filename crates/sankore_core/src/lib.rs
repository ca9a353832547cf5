//! Core domain logic for the Sankore book tracker.
//! This crate is the single source of truth for catalog invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{AppConfig, BackendKind, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::book::{
    display_title, parse_page_count, Book, BookId, BookValidationError, CurrentRun, NewBook,
    Rating, ReadRecord,
};
pub use model::library::{
    default_libraries, Library, ALREADY_READ, CURRENTLY_READING, READING_PAUSED, TO_READ,
};
pub use repo::json_repo::JsonFileRepository;
pub use repo::sqlite_repo::SqliteLibraryRepository;
pub use repo::{LibraryRepository, RepoError, RepoResult};
pub use service::library_service::{
    BookEdit, LibraryService, ServiceError, ServiceResult, UpdateOutcome,
};
pub use service::stats::{completed_in_month, reading_stats, ReadingStats};
pub use store::{Store, StoreError, StoreErrorKind, StoreResult, ALL_BOOKS};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
