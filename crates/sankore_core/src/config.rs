//! Runtime configuration for data storage and logging.
//!
//! # Responsibility
//! - Resolve the catalog data file relative to the installation directory.
//! - Pick the persistence backend from the data file extension.
//!
//! # Invariants
//! - `log_dir` is always absolute when built from an absolute install dir.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "sankore";
pub const DEFAULT_DATA_FILE: &str = "sankore.sqlite3";
pub const LOG_DIR_NAME: &str = "logs";

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// Executable location cannot be resolved.
    InstallDir(std::io::Error),
    /// Data file extension maps to no known backend.
    UnsupportedDataFile(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InstallDir(err) => write!(f, "cannot resolve installation directory: {err}"),
            Self::UnsupportedDataFile(path) => write!(
                f,
                "unsupported data file `{}`; expected .json, .sqlite3, .sqlite or .db",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InstallDir(err) => Some(err),
            Self::UnsupportedDataFile(_) => None,
        }
    }
}

/// Persistence backend selected for the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Json,
    Sqlite,
}

impl BackendKind {
    /// Infers the backend from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|value| value.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("sqlite3" | "sqlite" | "db") => Ok(Self::Sqlite),
            _ => Err(ConfigError::UnsupportedDataFile(path.to_path_buf())),
        }
    }
}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub backend: BackendKind,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl AppConfig {
    /// Default layout: data file and `logs/` next to the executable.
    pub fn for_install_dir(install_dir: &Path) -> Self {
        Self {
            data_path: install_dir.join(DEFAULT_DATA_FILE),
            backend: BackendKind::Sqlite,
            log_level: default_log_level().to_string(),
            log_dir: install_dir.join(LOG_DIR_NAME),
        }
    }

    /// Overrides the data file; relative paths resolve against `install_dir`.
    pub fn with_data_path(
        mut self,
        install_dir: &Path,
        data_path: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let data_path = data_path.as_ref();
        let resolved = if data_path.is_absolute() {
            data_path.to_path_buf()
        } else {
            install_dir.join(data_path)
        };
        self.backend = BackendKind::from_path(&resolved)?;
        self.data_path = resolved;
        Ok(self)
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

/// Directory holding the running executable.
pub fn install_dir() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(ConfigError::InstallDir)?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        ConfigError::InstallDir(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "executable has no parent directory",
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, BackendKind, ConfigError, DEFAULT_DATA_FILE};
    use std::path::{Path, PathBuf};

    #[test]
    fn backend_is_inferred_from_extension() {
        assert_eq!(
            BackendKind::from_path(Path::new("books.JSON")).unwrap(),
            BackendKind::Json
        );
        assert_eq!(
            BackendKind::from_path(Path::new("books.db")).unwrap(),
            BackendKind::Sqlite
        );
        assert!(matches!(
            BackendKind::from_path(Path::new("books.txt")),
            Err(ConfigError::UnsupportedDataFile(_))
        ));
    }

    #[test]
    fn defaults_live_next_to_install_dir() {
        let install = PathBuf::from("/opt/sankore");
        let config = AppConfig::for_install_dir(&install);
        assert_eq!(config.data_path, install.join(DEFAULT_DATA_FILE));
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.log_dir, install.join("logs"));
    }

    #[test]
    fn relative_data_path_resolves_against_install_dir() {
        let install = PathBuf::from("/opt/sankore");
        let config = AppConfig::for_install_dir(&install)
            .with_data_path(&install, "data/books.json")
            .unwrap();
        assert_eq!(config.data_path, install.join("data/books.json"));
        assert_eq!(config.backend, BackendKind::Json);
    }
}
