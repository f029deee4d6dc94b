//! Storage layer.
//!
//! Two logical tables back the engine:
//! - **behavior**: append-only action log ([`BehaviorStore`])
//! - **preferences**: one derived snapshot per user ([`PreferenceStore`])
//!
//! `SQLite` is the only backend; both stores may point at the same file.

// Dropping the connection guard slightly early buys nothing.
#![allow(clippy::significant_drop_tightening)]

pub mod sqlite;
pub mod traits;

pub use sqlite::{SqliteBehaviorStore, SqlitePreferenceStore};
pub use traits::{BehaviorStore, PreferenceStore};

use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// Shared handles to both stores.
#[derive(Clone)]
pub struct Stores {
    /// Behavior log.
    pub behavior: Arc<dyn BehaviorStore>,
    /// Preference snapshots.
    pub preferences: Arc<dyn PreferenceStore>,
}

/// Factory for creating the engine's stores.
pub struct StorageFactory;

impl StorageFactory {
    /// Opens both stores on one database file.
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be initialized.
    pub fn create_with_path(path: &Path) -> Result<Stores> {
        Ok(Stores {
            behavior: Arc::new(SqliteBehaviorStore::new(path)?),
            preferences: Arc::new(SqlitePreferenceStore::new(path)?),
        })
    }

    /// Creates in-memory stores (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be initialized.
    pub fn create_in_memory() -> Result<Stores> {
        Ok(Stores {
            behavior: Arc::new(SqliteBehaviorStore::in_memory()?),
            preferences: Arc::new(SqlitePreferenceStore::in_memory()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_in_memory() {
        assert!(StorageFactory::create_in_memory().is_ok());
    }

    #[test]
    fn test_create_with_path_shares_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("stencil.db");

        let stores = StorageFactory::create_with_path(&db_path).unwrap();
        assert!(
            stores
                .preferences
                .get(crate::models::UserId::new(1))
                .unwrap()
                .is_none()
        );
        assert!(db_path.exists());
    }
}
