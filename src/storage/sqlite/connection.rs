//! Shared connection handling for `SQLite` stores.
//!
//! Utilities for opening connections, recovering poisoned mutexes, and
//! applying the pragmas every store relies on.

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Acquires a mutex lock, recovering the inner value if it was poisoned.
///
/// A panic in a previous critical section leaves the connection itself
/// usable, so the guard is recovered and a warning is logged instead of
/// failing every later operation.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a connection for concurrent readers and a single writer.
///
/// - **WAL mode**: concurrent reads alongside one writer
/// - **NORMAL synchronous**: durability/performance balance
/// - **`busy_timeout`**: wait up to 5 seconds on lock contention
///
/// # Errors
///
/// Currently infallible; the pragma results are ignored because
/// `journal_mode` reports a string rather than failing.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");

    Ok(())
}

/// Opens (creating parent directories) and configures a file-backed connection.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the directory or database cannot be created.
pub fn open_connection(path: &Path, operation: &str) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: format!("{operation}_create_dir"),
            cause: e.to_string(),
        })?;
    }

    let conn = Connection::open(path).map_err(|e| Error::OperationFailed {
        operation: operation.to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Opens an in-memory connection (tests and ephemeral runs).
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if `SQLite` cannot allocate the database.
pub fn open_in_memory(operation: &str) -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    })?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Maps a `rusqlite` error into [`Error::OperationFailed`].
pub fn sql_error(operation: &str) -> impl FnOnce(rusqlite::Error) -> Error + '_ {
    move |e| Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}
