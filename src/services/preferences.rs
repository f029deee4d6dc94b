//! Preference aggregation service.
//!
//! Rolls a user's recent behavior up into a [`PreferenceSnapshot`]:
//!
//! | Action | Weight |
//! |--------|--------|
//! | implement | 5 |
//! | favorite | 4 |
//! | search | 2 |
//! | view / other | 1 |
//!
//! Each record adds its weight to its category and complexity, and splits
//! it evenly across its tags. Rankings order by score descending; equal
//! scores order by label ascending, and complexity ties go to the lower tier.

use crate::config::SuggestionConfig;
use crate::models::{BehaviorRecord, Complexity, PreferenceSnapshot, UserId};
use crate::storage::{BehaviorStore, PreferenceStore};
use crate::{Result, current_timestamp};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Weighted tallies over a window of behavior records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceTally {
    categories: HashMap<String, f64>,
    complexities: BTreeMap<Complexity, f64>,
    tags: HashMap<String, f64>,
}

impl PreferenceTally {
    /// Tallies a slice of records.
    #[must_use]
    pub fn from_records(records: &[BehaviorRecord]) -> Self {
        let mut tally = Self::default();
        for record in records {
            tally.add(record);
        }
        tally
    }

    /// Adds one record's weight.
    pub fn add(&mut self, record: &BehaviorRecord) {
        let weight = record.action.weight();
        let details = &record.item_details;

        if let Some(category) = details.category.as_deref().filter(|c| !c.is_empty()) {
            *self.categories.entry(category.to_string()).or_default() += weight;
        }

        if let Some(level) = details.complexity.as_deref().and_then(Complexity::parse) {
            *self.complexities.entry(level).or_default() += weight;
        }

        if let Some(tags) = details.tags.as_ref().filter(|t| !t.is_empty()) {
            #[allow(clippy::cast_precision_loss)]
            let share = weight / tags.len() as f64;
            for tag in tags.iter().filter(|t| !t.is_empty()) {
                *self.tags.entry(tag.clone()).or_default() += share;
            }
        }
    }

    /// Accumulated score of a category.
    #[must_use]
    pub fn category_score(&self, category: &str) -> f64 {
        self.categories.get(category).copied().unwrap_or(0.0)
    }

    /// Accumulated score of a tag.
    #[must_use]
    pub fn tag_score(&self, tag: &str) -> f64 {
        self.tags.get(tag).copied().unwrap_or(0.0)
    }

    /// Accumulated score of a complexity tier.
    #[must_use]
    pub fn complexity_score(&self, level: Complexity) -> f64 {
        self.complexities.get(&level).copied().unwrap_or(0.0)
    }

    /// Top `n` categories.
    #[must_use]
    pub fn top_categories(&self, n: usize) -> Vec<String> {
        rank(&self.categories, n)
    }

    /// Top `n` tags.
    #[must_use]
    pub fn top_tags(&self, n: usize) -> Vec<String> {
        rank(&self.tags, n)
    }

    /// Highest-scoring complexity, or `Beginner` without any signal.
    #[must_use]
    pub fn preferred_complexity(&self) -> Complexity {
        let mut best: Option<(Complexity, f64)> = None;
        // BTreeMap iterates in tier order, so only a strictly higher score
        // displaces the current best.
        for (level, score) in &self.complexities {
            if best.is_none_or(|(_, s)| *score > s) {
                best = Some((*level, *score));
            }
        }
        best.map(|(level, _)| level).unwrap_or_default()
    }

    /// Builds a snapshot from the tally.
    #[must_use]
    pub fn snapshot(
        &self,
        user_id: UserId,
        top_categories: usize,
        top_tags: usize,
        now: u64,
    ) -> PreferenceSnapshot {
        PreferenceSnapshot {
            user_id,
            preferred_categories: self.top_categories(top_categories),
            preferred_complexity: self.preferred_complexity(),
            preferred_tags: self.top_tags(top_tags),
            last_active: now,
        }
    }
}

fn rank(scores: &HashMap<String, f64>, n: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, f64)> = scores.iter().map(|(k, v)| (k, *v)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(label, _)| label.clone())
        .collect()
}

/// Window and ranking sizes for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationSettings {
    /// Records read per recompute.
    pub history_window: usize,
    /// Categories kept.
    pub top_categories: usize,
    /// Tags kept.
    pub top_tags: usize,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self::from(&SuggestionConfig::default())
    }
}

impl From<&SuggestionConfig> for AggregationSettings {
    fn from(config: &SuggestionConfig) -> Self {
        Self {
            history_window: config.history_window,
            top_categories: config.top_categories,
            top_tags: config.top_tags,
        }
    }
}

/// Recomputes and persists preference snapshots.
#[derive(Clone)]
pub struct PreferenceAggregator {
    behavior: Arc<dyn BehaviorStore>,
    preferences: Arc<dyn PreferenceStore>,
    settings: AggregationSettings,
}

impl PreferenceAggregator {
    /// Creates an aggregator.
    #[must_use]
    pub fn new(
        behavior: Arc<dyn BehaviorStore>,
        preferences: Arc<dyn PreferenceStore>,
        settings: AggregationSettings,
    ) -> Self {
        Self {
            behavior,
            preferences,
            settings,
        }
    }

    /// Recomputes the user's snapshot from their recent history.
    ///
    /// Returns `None`, writing nothing, when the user has no history or a
    /// storage operation fails.
    pub fn recompute_preferences(&self, user_id: UserId) -> Option<PreferenceSnapshot> {
        match self.try_recompute(user_id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Preference recompute failed");
                None
            },
        }
    }

    fn try_recompute(&self, user_id: UserId) -> Result<Option<PreferenceSnapshot>> {
        let records = self.behavior.recent(user_id, self.settings.history_window)?;
        if records.is_empty() {
            tracing::debug!(user_id = %user_id, "No behavior history; skipping snapshot");
            return Ok(None);
        }

        let snapshot = PreferenceTally::from_records(&records).snapshot(
            user_id,
            self.settings.top_categories,
            self.settings.top_tags,
            current_timestamp(),
        );
        self.preferences.upsert(&snapshot)?;

        tracing::debug!(
            user_id = %user_id,
            records = records.len(),
            complexity = %snapshot.preferred_complexity,
            categories = snapshot.preferred_categories.len(),
            tags = snapshot.preferred_tags.len(),
            "Recomputed preferences"
        );
        metrics::counter!("stencil_preferences_recomputed_total").increment(1);
        Ok(Some(snapshot))
    }
}
