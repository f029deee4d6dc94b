//! Behavior recording service.

use crate::models::{BehaviorAction, ItemDetails, ItemType, NewBehavior, UserId};
use crate::storage::BehaviorStore;
use crate::{Error, Result, current_timestamp};
use std::sync::Arc;

/// Appends behavior records without ever failing the caller.
#[derive(Clone)]
pub struct BehaviorRecorder {
    store: Arc<dyn BehaviorStore>,
}

impl BehaviorRecorder {
    /// Creates a recorder over a behavior store.
    #[must_use]
    pub fn new(store: Arc<dyn BehaviorStore>) -> Self {
        Self { store }
    }

    /// Records one action.
    ///
    /// Returns `true` when exactly one record was persisted. Invalid input
    /// and storage failures are logged and reported as `false`.
    pub fn record_action(
        &self,
        user_id: UserId,
        action: BehaviorAction,
        item_type: ItemType,
        item_id: impl Into<String>,
        item_details: Option<ItemDetails>,
    ) -> bool {
        self.record(&NewBehavior {
            user_id,
            action,
            item_type,
            item_id: item_id.into(),
            item_details: item_details.unwrap_or_default(),
        })
    }

    /// Records a prepared behavior. See [`Self::record_action`].
    pub fn record(&self, behavior: &NewBehavior) -> bool {
        match self.try_record(behavior) {
            Ok(id) => {
                tracing::debug!(
                    id,
                    user_id = %behavior.user_id,
                    action = %behavior.action,
                    item_type = %behavior.item_type,
                    item_id = %behavior.item_id,
                    "Recorded behavior"
                );
                metrics::counter!(
                    "stencil_behavior_recorded_total",
                    "action" => behavior.action.as_str().to_string()
                )
                .increment(1);
                true
            },
            Err(e) => {
                tracing::warn!(
                    user_id = %behavior.user_id,
                    action = %behavior.action,
                    item_id = %behavior.item_id,
                    error = %e,
                    "Failed to record behavior"
                );
                metrics::counter!("stencil_behavior_record_failures_total").increment(1);
                false
            },
        }
    }

    fn try_record(&self, behavior: &NewBehavior) -> Result<i64> {
        if !behavior.action.is_known() {
            return Err(Error::InvalidInput(format!(
                "unknown action '{}'",
                behavior.action
            )));
        }
        if behavior.item_id.trim().is_empty() {
            return Err(Error::InvalidInput("item id cannot be empty".to_string()));
        }

        self.store.append(behavior, current_timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BehaviorRecord;
    use crate::storage::SqliteBehaviorStore;

    struct FailingStore;

    impl BehaviorStore for FailingStore {
        fn append(&self, _behavior: &NewBehavior, _timestamp: u64) -> Result<i64> {
            Err(Error::OperationFailed {
                operation: "append_behavior".to_string(),
                cause: "database is locked".to_string(),
            })
        }

        fn recent(&self, _user_id: UserId, _limit: usize) -> Result<Vec<BehaviorRecord>> {
            Ok(Vec::new())
        }

        fn recent_template_interactions(
            &self,
            _user_id: UserId,
            _limit: usize,
        ) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn recorder() -> (BehaviorRecorder, Arc<SqliteBehaviorStore>) {
        let store = Arc::new(SqliteBehaviorStore::in_memory().unwrap());
        (BehaviorRecorder::new(store.clone()), store)
    }

    #[test]
    fn test_record_action_persists_one_record() {
        let (recorder, store) = recorder();
        let details = ItemDetails::new().with_category("forms").with_tags(["a"]);

        assert!(recorder.record_action(
            UserId::new(1),
            BehaviorAction::Implement,
            ItemType::Template,
            "basic-form",
            Some(details.clone()),
        ));

        let records = store.recent(UserId::new(1), 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item_details, details);
        assert!(records[0].timestamp > 0);
    }

    #[test]
    fn test_record_action_without_details() {
        let (recorder, store) = recorder();
        assert!(recorder.record_action(
            UserId::new(1),
            BehaviorAction::Search,
            ItemType::File,
            "hero image",
            None,
        ));
        let records = store.recent(UserId::new(1), 10).unwrap();
        assert!(records[0].item_details.is_empty());
    }

    #[test]
    fn test_empty_item_id_is_rejected() {
        let (recorder, store) = recorder();
        assert!(!recorder.record_action(
            UserId::new(1),
            BehaviorAction::View,
            ItemType::Template,
            "  ",
            None,
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let (recorder, store) = recorder();
        assert!(!recorder.record_action(
            UserId::new(1),
            BehaviorAction::Other("share".to_string()),
            ItemType::Template,
            "basic-form",
            None,
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_storage_failure_returns_false() {
        let recorder = BehaviorRecorder::new(Arc::new(FailingStore));
        assert!(!recorder.record_action(
            UserId::new(1),
            BehaviorAction::View,
            ItemType::Template,
            "basic-form",
            None,
        ));
    }
}
