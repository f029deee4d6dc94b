//! SQLite-backed preference snapshots.

use super::connection::{acquire_lock, open_connection, open_in_memory, sql_error};
use crate::models::{Complexity, PreferenceSnapshot, UserId};
use crate::storage::PreferenceStore;
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// `SQLite` store for the `preferences` table, keyed by user.
pub struct SqlitePreferenceStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqlitePreferenceStore {
    /// Opens (or creates) the store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = open_connection(&db_path, "open_preferences_db")?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(open_in_memory("open_preferences_db_memory")?),
            db_path: PathBuf::from(":memory:"),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "CREATE TABLE IF NOT EXISTS preferences (
                user_id INTEGER PRIMARY KEY,
                preferred_categories TEXT NOT NULL DEFAULT '[]',
                preferred_complexity TEXT NOT NULL DEFAULT 'beginner',
                preferred_tags TEXT NOT NULL DEFAULT '[]',
                last_active INTEGER NOT NULL
            )",
            [],
        )
        .map_err(sql_error("create_preferences_table"))?;
        Ok(())
    }
}

/// Parses a JSON array column, treating garbage as empty.
fn parse_labels(raw: &str, column: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(column, error = %e, "Preference column is not a JSON array");
        Vec::new()
    })
}

fn to_json(labels: &[String], operation: &str) -> Result<String> {
    serde_json::to_string(labels).map_err(|e| Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    })
}

impl PreferenceStore for SqlitePreferenceStore {
    fn get(&self, user_id: UserId) -> Result<Option<PreferenceSnapshot>> {
        let conn = acquire_lock(&self.conn);
        let row = conn
            .query_row(
                "SELECT preferred_categories, preferred_complexity, preferred_tags, last_active
                 FROM preferences WHERE user_id = ?1",
                params![user_id.get()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(sql_error("get_preferences"))?;

        Ok(row.map(|(categories, complexity, tags, last_active)| PreferenceSnapshot {
            user_id,
            preferred_categories: parse_labels(&categories, "preferred_categories"),
            preferred_complexity: Complexity::parse(&complexity).unwrap_or_default(),
            preferred_tags: parse_labels(&tags, "preferred_tags"),
            last_active: u64::try_from(last_active).unwrap_or(0),
        }))
    }

    fn upsert(&self, snapshot: &PreferenceSnapshot) -> Result<()> {
        let categories = to_json(&snapshot.preferred_categories, "serialize_categories")?;
        let tags = to_json(&snapshot.preferred_tags, "serialize_tags")?;
        let last_active =
            i64::try_from(snapshot.last_active).map_err(|e| Error::InvalidInput(e.to_string()))?;

        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO preferences
                (user_id, preferred_categories, preferred_complexity, preferred_tags, last_active)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                preferred_categories = excluded.preferred_categories,
                preferred_complexity = excluded.preferred_complexity,
                preferred_tags = excluded.preferred_tags,
                last_active = excluded.last_active",
            params![
                snapshot.user_id.get(),
                categories,
                snapshot.preferred_complexity.as_str(),
                tags,
                last_active,
            ],
        )
        .map_err(sql_error("upsert_preferences"))?;
        Ok(())
    }
}
