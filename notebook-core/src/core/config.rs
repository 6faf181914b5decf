//! Environment-driven configuration.

use std::path::PathBuf;

/// Environment variable naming the SQLite database file.
pub const DATABASE_PATH_ENV: &str = "NOTEBOOK_DATABASE_PATH";

/// Database location used when [`DATABASE_PATH_ENV`] is unset.
pub const DEFAULT_DATABASE_PATH: &str = "data/notebook.db";

#[derive(Debug, Clone, PartialEq)]
pub struct NotebookConfig {
    pub database_path: PathBuf,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl NotebookConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup(DATABASE_PATH_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));
        Self { database_path }
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }
}
