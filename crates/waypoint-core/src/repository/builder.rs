//! Builder for creating and configuring PlanRepository instances.

use std::path::{Path, PathBuf};

use super::{PlanRepository, DEFAULT_WRITE_RETRIES};
use crate::{
    db::Database,
    error::{EngineError, Result},
};

/// Builder for creating and configuring PlanRepository instances.
#[derive(Debug, Clone)]
pub struct RepositoryBuilder {
    database_path: Option<PathBuf>,
    max_write_retries: u32,
}

impl RepositoryBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            database_path: None,
            max_write_retries: DEFAULT_WRITE_RETRIES,
        }
    }

    /// Sets a custom database file path.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/waypoint/waypoint.db` or
    /// `~/.local/share/waypoint/waypoint.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets how many times a conflicting document write is re-attempted.
    pub fn with_max_write_retries(mut self, retries: u32) -> Self {
        self.max_write_retries = retries;
        self
    }

    /// Builds the configured repository, creating the database file and
    /// schema if needed.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::FileSystem` if the database directory cannot be
    /// created, `EngineError::Database` if schema initialization fails
    pub async fn build(self) -> Result<PlanRepository> {
        let db_path = match self.database_path {
            Some(path) => path,
            None => Self::default_database_path()?,
        };

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let repository = PlanRepository::new(db_path, self.max_write_retries);
        repository.blocking(|_db: &mut Database| Ok(())).await?;

        Ok(repository)
    }

    /// Returns the default database path following XDG Base Directory
    /// specification.
    fn default_database_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("waypoint")
            .place_data_file("waypoint.db")
            .map_err(|e| EngineError::XdgDirectory(e.to_string()))
    }
}

impl Default for RepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
