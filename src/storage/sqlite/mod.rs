//! `SQLite` storage backends.
//!
//! Each store owns its own `Mutex<Connection>`; the behavior log and the
//! preference snapshots may share one database file. WAL mode keeps the
//! two connections from blocking each other on reads.

mod behavior;
mod connection;
mod preferences;

pub use behavior::SqliteBehaviorStore;
pub use connection::{acquire_lock, configure_connection, open_connection, open_in_memory};
pub use preferences::SqlitePreferenceStore;
