//! Property-based tests for aggregation and composition.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Tag shares sum to the weight of the records that carry tags
//! - Rankings are bounded and score-descending
//! - Composed suggestions are bounded, unique, and skip excluded ids
//! - Recomputing without new records is stable

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use std::collections::HashSet;
use stencil::models::BehaviorRecord;
use stencil::services::PreferenceTally;
use stencil::{
    BehaviorAction, Complexity, Engine, ItemDetails, ItemType, PreferenceSnapshot, StencilConfig,
    SuggestionRequest, UserId,
};

fn action() -> impl Strategy<Value = BehaviorAction> {
    prop_oneof![
        Just(BehaviorAction::View),
        Just(BehaviorAction::Implement),
        Just(BehaviorAction::Search),
        Just(BehaviorAction::Favorite),
        Just(BehaviorAction::Other("share".to_string())),
    ]
}

fn label() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["forms", "blog", "shop", "react", "vue", "cards", "charts"])
        .prop_map(str::to_string)
}

fn complexity_label() -> impl Strategy<Value = Option<String>> {
    prop::option::of(
        prop::sample::select(vec!["beginner", "intermediate", "advanced", "expert"])
            .prop_map(str::to_string),
    )
}

fn record() -> impl Strategy<Value = BehaviorRecord> {
    (
        action(),
        prop::option::of(label()),
        complexity_label(),
        prop::option::of(prop::collection::hash_set(label(), 0..4)),
    )
        .prop_map(|(action, category, complexity, tags)| BehaviorRecord {
            id: 0,
            user_id: UserId::new(1),
            action,
            item_type: ItemType::Template,
            item_id: "t".to_string(),
            item_details: ItemDetails {
                category,
                complexity,
                tags: tags.map(|t| t.into_iter().collect()),
                extra: serde_json::Map::new(),
            },
            timestamp: 0,
        })
}

fn snapshot() -> impl Strategy<Value = PreferenceSnapshot> {
    (
        prop::sample::select(Complexity::all().to_vec()),
        prop::collection::vec(label(), 0..5),
        prop::collection::vec(label(), 0..10),
    )
        .prop_map(|(complexity, categories, tags)| PreferenceSnapshot {
            user_id: UserId::new(1),
            preferred_categories: categories,
            preferred_complexity: complexity,
            preferred_tags: tags,
            last_active: 0,
        })
}

proptest! {
    /// Property: each tagged record contributes exactly its weight to tags.
    #[test]
    fn prop_tag_shares_sum_to_weight(records in prop::collection::vec(record(), 0..40)) {
        let tally = PreferenceTally::from_records(&records);
        let labels: HashSet<String> = records
            .iter()
            .filter_map(|r| r.item_details.tags.clone())
            .flatten()
            .collect();

        let expected: f64 = records
            .iter()
            .filter(|r| r.item_details.tags.as_ref().is_some_and(|t| !t.is_empty()))
            .map(|r| r.action.weight())
            .sum();
        let total: f64 = labels.iter().map(|l| tally.tag_score(l)).sum();
        prop_assert!((total - expected).abs() < 1e-6);
    }

    /// Property: rankings are bounded and ordered by score, then label.
    #[test]
    fn prop_rankings_are_ordered(
        records in prop::collection::vec(record(), 0..40),
        n in 0usize..8,
    ) {
        let tally = PreferenceTally::from_records(&records);
        let top = tally.top_categories(n);
        prop_assert!(top.len() <= n);
        for pair in top.windows(2) {
            let (a, b) = (tally.category_score(&pair[0]), tally.category_score(&pair[1]));
            prop_assert!(a + 1e-9 >= b);
            if (a - b).abs() < f64::EPSILON {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }

    /// Property: the preferred complexity carries the highest score.
    #[test]
    fn prop_preferred_complexity_is_max(records in prop::collection::vec(record(), 0..40)) {
        let tally = PreferenceTally::from_records(&records);
        let preferred = tally.preferred_complexity();
        let best = tally.complexity_score(preferred);
        for level in Complexity::all() {
            prop_assert!(tally.complexity_score(*level) <= best);
        }
    }

    /// Property: composed suggestions are bounded, unique, and not excluded.
    #[test]
    fn prop_compose_invariants(
        snap in snapshot(),
        excluded in prop::collection::hash_set(
            prop::sample::select(vec![
                "simple-card-component", "basic-form", "data-table",
                "realtime-dashboard", "forms-template-1", "react-template-2",
            ]).prop_map(str::to_string),
            0..4,
        ),
        limit in 1usize..20,
        flags in (any::<bool>(), any::<bool>(), any::<bool>()),
    ) {
        let engine = Engine::in_memory(StencilConfig::default()).unwrap();
        let request = SuggestionRequest::new(limit)
            .with_complexity(flags.0)
            .with_categories(flags.1)
            .with_tags(flags.2);
        let suggestions = engine.composer().compose(&snap, &excluded, &request);

        prop_assert!(suggestions.len() <= limit);
        let unique: HashSet<&str> = suggestions.iter().map(|s| s.template_id.as_str()).collect();
        prop_assert_eq!(unique.len(), suggestions.len());
        prop_assert!(suggestions.iter().all(|s| !excluded.contains(&s.template_id)));
        prop_assert!(!suggestions.is_empty());
    }

    /// Property: recomputing twice without new records gives equal snapshots.
    #[test]
    fn prop_recompute_is_stable(records in prop::collection::vec(record(), 1..20)) {
        let engine = Engine::in_memory(StencilConfig::default()).unwrap();
        for r in &records {
            let action = if r.action.is_known() { r.action.clone() } else { BehaviorAction::View };
            prop_assert!(engine.recorder().record_action(
                UserId::new(1),
                action,
                r.item_type,
                r.item_id.clone(),
                Some(r.item_details.clone()),
            ));
        }

        let first = engine.aggregator().recompute_preferences(UserId::new(1)).unwrap();
        let second = engine.aggregator().recompute_preferences(UserId::new(1)).unwrap();
        prop_assert!(first.same_preferences(&second));
        prop_assert!(first.preferred_categories.len() <= 5);
        prop_assert!(first.preferred_tags.len() <= 10);
    }

    /// Property: known actions parse case-insensitively.
    #[test]
    fn prop_action_parse_case_insensitive(idx in 0usize..4) {
        let known = &BehaviorAction::known()[idx];
        let parsed = BehaviorAction::parse(&known.as_str().to_uppercase());
        prop_assert_eq!(parsed.as_ref(), Some(known));
    }
}
