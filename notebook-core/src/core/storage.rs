//! SQLite connection ownership, schema creation and migrations.

use crate::Result;
use rusqlite::Connection;
use std::path::Path;

/// Owns the single SQLite connection behind a [`Notebook`](crate::Notebook).
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (or creates) the database at `path`, creating missing parent
    /// directories, applying the schema and running pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`crate::NotebookError::Io`] if the parent directory cannot be
    /// created, or [`crate::NotebookError::Database`] if the file is not a
    /// SQLite database or the schema cannot be applied.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Opens a private in-memory database with the full schema applied.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(include_str!("schema.sql"))?;

        // Migrate: databases created before sibling ordering lack `position`.
        let column_exists: bool = conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('documents') WHERE name='position'",
            [],
            |row| row.get::<_, i64>(0).map(|count| count > 0),
        )?;

        if !column_exists {
            log::info!("adding 'position' column to 'documents' table");
            conn.execute(
                "ALTER TABLE documents ADD COLUMN position INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
