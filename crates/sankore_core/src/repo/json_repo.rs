//! Flat-file JSON repository.
//!
//! The document shape is `{"libraries": [...]}`; the `All Books` view is
//! never written.

use crate::repo::{LibraryRepository, RepoResult};
use crate::store::Store;
use log::{info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// JSON document repository rooted at one file path.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|value| value.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LibraryRepository for JsonFileRepository {
    /// Never fails: a missing, unreadable or malformed document, or one that
    /// breaks store invariants, yields the default store.
    fn load(&self) -> RepoResult<Store> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("event=store_load module=repo backend=json status=ok source=default reason=missing");
                return Ok(Store::with_default_libraries());
            }
            Err(err) => {
                warn!(
                    "event=store_load module=repo backend=json status=fallback error_code=read_failed error={}",
                    err
                );
                return Ok(Store::with_default_libraries());
            }
        };

        let store = match serde_json::from_str::<Store>(&text) {
            Ok(store) => store,
            Err(err) => {
                warn!(
                    "event=store_load module=repo backend=json status=fallback error_code=parse_failed line={} column={}",
                    err.line(),
                    err.column()
                );
                return Ok(Store::with_default_libraries());
            }
        };

        match store.checked() {
            Ok(store) => {
                info!(
                    "event=store_load module=repo backend=json status=ok libraries={} books={}",
                    store.libraries().len(),
                    store.book_count()
                );
                Ok(store)
            }
            Err(err) => {
                warn!(
                    "event=store_load module=repo backend=json status=fallback error_code=invalid_store kind={:?}",
                    err.kind()
                );
                Ok(Store::with_default_libraries())
            }
        }
    }

    /// Writes a sibling temp file and renames it over the document.
    fn save(&mut self, store: &Store) -> RepoResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let document = serde_json::to_string_pretty(store)?;
        let temp_path = self.temp_path();
        std::fs::write(&temp_path, document)?;
        std::fs::rename(&temp_path, &self.path)?;
        info!(
            "event=store_save module=repo backend=json status=ok libraries={} books={}",
            store.libraries().len(),
            store.book_count()
        );
        Ok(())
    }
}
