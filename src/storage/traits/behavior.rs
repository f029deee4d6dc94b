//! Behavior log storage trait.

use crate::Result;
use crate::models::{BehaviorRecord, NewBehavior, UserId};

/// Append-only storage for behavior records.
///
/// Implementations never update or delete records. "Recent" always means
/// newest first by timestamp, with later inserts first among equal
/// timestamps.
pub trait BehaviorStore: Send + Sync {
    /// Appends one record and returns its storage identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn append(&self, behavior: &NewBehavior, timestamp: u64) -> Result<i64>;

    /// Returns up to `limit` of the user's most recent records.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn recent(&self, user_id: UserId, limit: usize) -> Result<Vec<BehaviorRecord>>;

    /// Returns the item ids of the user's `limit` most recent `view` or
    /// `implement` actions on templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn recent_template_interactions(&self, user_id: UserId, limit: usize) -> Result<Vec<String>>;
}
