//! Preference snapshot storage trait.

use crate::Result;
use crate::models::{PreferenceSnapshot, UserId};

/// Storage holding at most one preference snapshot per user.
pub trait PreferenceStore: Send + Sync {
    /// Gets the user's snapshot, if one has been computed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn get(&self, user_id: UserId) -> Result<Option<PreferenceSnapshot>>;

    /// Inserts the snapshot or replaces the existing one wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn upsert(&self, snapshot: &PreferenceSnapshot) -> Result<()>;
}
