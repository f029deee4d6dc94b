//! SQLite-backed behavior log.

use super::connection::{acquire_lock, open_connection, open_in_memory, sql_error};
use crate::models::{BehaviorAction, BehaviorRecord, ItemDetails, ItemType, NewBehavior, UserId};
use crate::storage::BehaviorStore;
use crate::{Error, Result};
use rusqlite::{Connection, Row, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// `SQLite` store for the append-only `behavior` table.
pub struct SqliteBehaviorStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

/// Raw `behavior` row before type conversion.
struct BehaviorRow {
    id: i64,
    user_id: i64,
    action: String,
    item_type: String,
    item_id: String,
    item_details: String,
    timestamp: i64,
}

impl BehaviorRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            action: row.get(2)?,
            item_type: row.get(3)?,
            item_id: row.get(4)?,
            item_details: row.get(5)?,
            timestamp: row.get(6)?,
        })
    }

    /// Converts into a record; `None` for rows with an unknown item type.
    fn into_record(self) -> Option<BehaviorRecord> {
        let Some(item_type) = ItemType::parse(&self.item_type) else {
            tracing::warn!(
                id = self.id,
                item_type = %self.item_type,
                "Skipping behavior row with unknown item type"
            );
            return None;
        };

        let item_details = serde_json::from_str::<serde_json::Value>(&self.item_details)
            .map(ItemDetails::from)
            .unwrap_or_else(|e| {
                tracing::warn!(id = self.id, error = %e, "Behavior row has unparseable details");
                ItemDetails::default()
            });

        Some(BehaviorRecord {
            id: self.id,
            user_id: UserId::new(self.user_id),
            action: BehaviorAction::from(self.action),
            item_type,
            item_id: self.item_id,
            item_details,
            timestamp: u64::try_from(self.timestamp).unwrap_or(0),
        })
    }
}

impl SqliteBehaviorStore {
    /// Opens (or creates) the store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = open_connection(&db_path, "open_behavior_db")?;
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
            conn: Mutex::new(open_in_memory("open_behavior_db_memory")?),
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

    /// Returns the total number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub fn count(&self) -> Result<u64> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM behavior", [], |row| row.get(0))
            .map_err(sql_error("count_behavior"))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);

        conn.execute(
            "CREATE TABLE IF NOT EXISTS behavior (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                action TEXT NOT NULL,
                item_type TEXT NOT NULL,
                item_id TEXT NOT NULL,
                item_details TEXT NOT NULL DEFAULT '{}',
                timestamp INTEGER NOT NULL
            )",
            [],
        )
        .map_err(sql_error("create_behavior_table"))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_behavior_user_recent
             ON behavior(user_id, timestamp DESC, id DESC)",
            [],
        )
        .map_err(sql_error("create_behavior_index"))?;

        Ok(())
    }
}

/// Converts a caller-supplied limit into an `SQLite` integer.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl BehaviorStore for SqliteBehaviorStore {
    fn append(&self, behavior: &NewBehavior, timestamp: u64) -> Result<i64> {
        let details = serde_json::to_string(&behavior.item_details).map_err(|e| {
            Error::OperationFailed {
                operation: "serialize_item_details".to_string(),
                cause: e.to_string(),
            }
        })?;
        let timestamp = i64::try_from(timestamp).map_err(|e| Error::InvalidInput(e.to_string()))?;

        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO behavior (user_id, action, item_type, item_id, item_details, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                behavior.user_id.get(),
                behavior.action.as_str(),
                behavior.item_type.as_str(),
                behavior.item_id,
                details,
                timestamp,
            ],
        )
        .map_err(sql_error("append_behavior"))?;

        Ok(conn.last_insert_rowid())
    }

    fn recent(&self, user_id: UserId, limit: usize) -> Result<Vec<BehaviorRecord>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, user_id, action, item_type, item_id, item_details, timestamp
                 FROM behavior
                 WHERE user_id = ?1
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?2",
            )
            .map_err(sql_error("prepare_recent_behavior"))?;

        let rows = stmt
            .query_map(params![user_id.get(), sql_limit(limit)], BehaviorRow::from_row)
            .map_err(sql_error("query_recent_behavior"))?;

        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(sql_error("read_behavior_row"))?;
            records.extend(row.into_record());
        }
        Ok(records)
    }

    fn recent_template_interactions(&self, user_id: UserId, limit: usize) -> Result<Vec<String>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare_cached(
                "SELECT item_id
                 FROM behavior
                 WHERE user_id = ?1
                   AND item_type = 'template'
                   AND action IN ('view', 'implement')
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?2",
            )
            .map_err(sql_error("prepare_template_interactions"))?;

        let ids = stmt
            .query_map(params![user_id.get(), sql_limit(limit)], |row| {
                row.get::<_, String>(0)
            })
            .map_err(sql_error("query_template_interactions"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sql_error("read_template_interaction"))?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn behavior(user: i64, action: BehaviorAction, item_type: ItemType, id: &str) -> NewBehavior {
        NewBehavior {
            user_id: UserId::new(user),
            action,
            item_type,
            item_id: id.to_string(),
            item_details: ItemDetails::new().with_category("forms"),
        }
    }

    #[test]
    fn test_append_and_recent_newest_first() {
        let store = SqliteBehaviorStore::in_memory().unwrap();
        store
            .append(&behavior(1, BehaviorAction::View, ItemType::Template, "a"), 100)
            .unwrap();
        store
            .append(&behavior(1, BehaviorAction::Implement, ItemType::Template, "b"), 200)
            .unwrap();
        store
            .append(&behavior(2, BehaviorAction::View, ItemType::Template, "c"), 300)
            .unwrap();

        let records = store.recent(UserId::new(1), 10).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(records[0].action, BehaviorAction::Implement);
        assert_eq!(records[0].timestamp, 200);
        assert_eq!(records[0].item_details.category.as_deref(), Some("forms"));
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_recent_same_timestamp_orders_by_insert() {
        let store = SqliteBehaviorStore::in_memory().unwrap();
        for id in ["first", "second", "third"] {
            store
                .append(&behavior(1, BehaviorAction::View, ItemType::Template, id), 500)
                .unwrap();
        }

        let records = store.recent(UserId::new(1), 2).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["third", "second"]);
    }

    #[test]
    fn test_recent_template_interactions_filters() {
        let store = SqliteBehaviorStore::in_memory().unwrap();
        store
            .append(&behavior(1, BehaviorAction::View, ItemType::Template, "viewed"), 1)
            .unwrap();
        store
            .append(&behavior(1, BehaviorAction::Implement, ItemType::Template, "built"), 2)
            .unwrap();
        store
            .append(&behavior(1, BehaviorAction::Favorite, ItemType::Template, "liked"), 3)
            .unwrap();
        store
            .append(&behavior(1, BehaviorAction::Search, ItemType::File, "query"), 4)
            .unwrap();
        store
            .append(&behavior(1, BehaviorAction::View, ItemType::Category, "forms"), 5)
            .unwrap();

        let ids = store.recent_template_interactions(UserId::new(1), 20).unwrap();
        assert_eq!(ids, vec!["built".to_string(), "viewed".to_string()]);
    }

    #[test]
    fn test_unknown_rows_are_lenient() {
        let store = SqliteBehaviorStore::in_memory().unwrap();
        {
            let conn = acquire_lock(&store.conn);
            conn.execute(
                "INSERT INTO behavior (user_id, action, item_type, item_id, item_details, timestamp)
                 VALUES (1, 'share', 'template', 'shared', 'not json', 10),
                        (1, 'view', 'widget', 'odd', '{}', 11)",
                [],
            )
            .unwrap();
        }

        let records = store.recent(UserId::new(1), 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, BehaviorAction::Other("share".to_string()));
        assert!(records[0].item_details.is_empty());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stencil.db");
        {
            let store = SqliteBehaviorStore::new(&path).unwrap();
            store
                .append(&behavior(4, BehaviorAction::Search, ItemType::File, "hero"), 7)
                .unwrap();
        }

        let reopened = SqliteBehaviorStore::new(&path).unwrap();
        assert_eq!(reopened.db_path(), path.as_path());
        assert_eq!(reopened.recent(UserId::new(4), 5).unwrap().len(), 1);
    }
}
