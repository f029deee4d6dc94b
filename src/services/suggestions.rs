//! Suggestion composition service.
//!
//! Builds a ranked list of templates from a user's preference snapshot.
//! Strategies run in a fixed order (complexity, category, tag) and each
//! contributes at most [`PER_STRATEGY_CAP`] candidates. Templates the user
//! recently viewed or implemented are skipped, duplicates keep their first
//! occurrence, and any shortfall is filled with beginner defaults.

use crate::Result;
use crate::catalog::{CatalogEntry, TemplateCatalog};
use crate::config::FeatureFlags;
use crate::models::{Complexity, PreferenceSnapshot, SuggestionRequest, TemplateSuggestion, UserId};
use crate::services::PreferenceAggregator;
use crate::storage::{BehaviorStore, PreferenceStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Most candidates a single strategy may contribute.
pub const PER_STRATEGY_CAP: usize = 3;

/// Categories consulted by the category strategy.
const CATEGORY_FANOUT: usize = 2;
/// Tags consulted by the tag strategy.
const TAG_FANOUT: usize = 3;
/// Templates fetched per category or tag.
const PER_LABEL_LIMIT: usize = 2;

/// Reason attached to beginner-default suggestions.
pub const POPULAR_REASON: &str = "Popular template";

/// Candidate-producing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Default templates of the preferred complexity tier.
    Complexity,
    /// Templates from the top categories.
    Category,
    /// Templates carrying the top tags.
    Tag,
}

impl Strategy {
    /// Strategies in evaluation order.
    pub const ORDER: [Self; 3] = [Self::Complexity, Self::Category, Self::Tag];

    const fn enabled(self, request: &SuggestionRequest) -> bool {
        match self {
            Self::Complexity => request.include_complexity,
            Self::Category => request.include_categories,
            Self::Tag => request.include_tags,
        }
    }

    /// Returns the strategy's name for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complexity => "complexity",
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }
}

/// Composes template suggestions.
#[derive(Clone)]
pub struct SuggestionComposer {
    behavior: Arc<dyn BehaviorStore>,
    preferences: Arc<dyn PreferenceStore>,
    aggregator: PreferenceAggregator,
    catalog: Arc<dyn TemplateCatalog>,
    exclusion_window: usize,
    lazy_preferences: bool,
}

impl SuggestionComposer {
    /// Creates a composer.
    #[must_use]
    pub fn new(
        behavior: Arc<dyn BehaviorStore>,
        preferences: Arc<dyn PreferenceStore>,
        aggregator: PreferenceAggregator,
        catalog: Arc<dyn TemplateCatalog>,
    ) -> Self {
        Self {
            behavior,
            preferences,
            aggregator,
            catalog,
            exclusion_window: crate::config::SuggestionConfig::default().exclusion_window,
            lazy_preferences: FeatureFlags::default().lazy_preferences,
        }
    }

    /// Sets how many recent template interactions are excluded.
    #[must_use]
    pub const fn with_exclusion_window(mut self, window: usize) -> Self {
        self.exclusion_window = window;
        self
    }

    /// Enables or disables computing a snapshot on first request.
    #[must_use]
    pub const fn with_lazy_preferences(mut self, enabled: bool) -> Self {
        self.lazy_preferences = enabled;
        self
    }

    /// Returns up to `request.limit` suggestions for a user.
    ///
    /// Never fails: any storage error yields the beginner defaults.
    pub fn get_suggestions(
        &self,
        user_id: UserId,
        request: &SuggestionRequest,
    ) -> Vec<TemplateSuggestion> {
        match self.try_compose(user_id, request) {
            Ok((suggestions, source)) => {
                tracing::debug!(
                    user_id = %user_id,
                    count = suggestions.len(),
                    source,
                    "Composed suggestions"
                );
                metrics::counter!("stencil_suggestions_served_total", "source" => source)
                    .increment(1);
                suggestions
            },
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Suggestion composition failed");
                metrics::counter!("stencil_suggestion_fallbacks_total").increment(1);
                self.beginner_defaults(request.limit)
            },
        }
    }

    /// Beginner-tier defaults with the popular-template reason.
    #[must_use]
    pub fn beginner_defaults(&self, limit: usize) -> Vec<TemplateSuggestion> {
        self.catalog
            .by_complexity(Complexity::Beginner)
            .into_iter()
            .take(limit)
            .map(|entry| TemplateSuggestion::new(entry.template_id, entry.score, POPULAR_REASON))
            .collect()
    }

    fn try_compose(
        &self,
        user_id: UserId,
        request: &SuggestionRequest,
    ) -> Result<(Vec<TemplateSuggestion>, &'static str)> {
        let mut snapshot = self.preferences.get(user_id)?;
        if snapshot.is_none() && self.lazy_preferences {
            snapshot = self.aggregator.recompute_preferences(user_id);
        }

        let excluded: HashSet<String> = self
            .behavior
            .recent_template_interactions(user_id, self.exclusion_window)?
            .into_iter()
            .collect();

        let Some(snapshot) = snapshot else {
            let defaults = self
                .beginner_defaults(usize::MAX)
                .into_iter()
                .filter(|d| !excluded.contains(&d.template_id))
                .take(request.limit)
                .collect();
            return Ok((defaults, "defaults"));
        };

        Ok((self.compose(&snapshot, &excluded, request), "preferences"))
    }

    /// Runs the strategies against a snapshot.
    #[must_use]
    pub fn compose(
        &self,
        snapshot: &PreferenceSnapshot,
        excluded: &HashSet<String>,
        request: &SuggestionRequest,
    ) -> Vec<TemplateSuggestion> {
        let limit = request.limit;
        let mut candidates: Vec<TemplateSuggestion> = Vec::new();

        for strategy in Strategy::ORDER {
            if candidates.len() >= limit {
                break;
            }
            if !strategy.enabled(request) {
                continue;
            }
            candidates.extend(self.run(strategy, snapshot, excluded));
        }

        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.template_id.clone()));

        if candidates.len() < limit {
            let backfill: Vec<TemplateSuggestion> = self
                .beginner_defaults(usize::MAX)
                .into_iter()
                .filter(|d| !seen.contains(&d.template_id) && !excluded.contains(&d.template_id))
                .collect();
            candidates.extend(backfill);
        }

        candidates.truncate(limit);
        candidates
    }

    fn run(
        &self,
        strategy: Strategy,
        snapshot: &PreferenceSnapshot,
        excluded: &HashSet<String>,
    ) -> Vec<TemplateSuggestion> {
        let entries: Vec<(CatalogEntry, String)> = match strategy {
            Strategy::Complexity => {
                let level = snapshot.preferred_complexity;
                let reason = format!("Based on your preferred complexity level: {level}");
                self.catalog
                    .by_complexity(level)
                    .into_iter()
                    .map(|entry| (entry, reason.clone()))
                    .collect()
            },
            Strategy::Category => snapshot
                .preferred_categories
                .iter()
                .take(CATEGORY_FANOUT)
                .flat_map(|category| {
                    let reason = format!("From your favorite category: {category}");
                    self.catalog
                        .by_category(category, PER_LABEL_LIMIT)
                        .into_iter()
                        .map(move |entry| (entry, reason.clone()))
                })
                .collect(),
            Strategy::Tag => snapshot
                .preferred_tags
                .iter()
                .take(TAG_FANOUT)
                .flat_map(|tag| {
                    let reason = format!("Matches your interest in \"{tag}\"");
                    self.catalog
                        .by_tag(tag, PER_LABEL_LIMIT)
                        .into_iter()
                        .map(move |entry| (entry, reason.clone()))
                })
                .collect(),
        };

        let picked: Vec<TemplateSuggestion> = entries
            .into_iter()
            .filter(|(entry, _)| !excluded.contains(&entry.template_id))
            .take(PER_STRATEGY_CAP)
            .map(|(entry, reason)| TemplateSuggestion::new(entry.template_id, entry.score, reason))
            .collect();

        tracing::trace!(strategy = strategy.as_str(), picked = picked.len(), "Strategy ran");
        picked
    }
}
