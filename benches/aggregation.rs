//! Benchmarks for preference aggregation and suggestion composition.
//!
//! Covers:
//! - Tallying a full history window in memory
//! - Recompute against a file-backed store
//! - Serving suggestions with a stored snapshot

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;
use tempfile::TempDir;

use stencil::models::BehaviorRecord;
use stencil::services::PreferenceTally;
use stencil::{
    BehaviorAction, Engine, ItemDetails, ItemType, StencilConfig, SuggestionRequest, UserId,
};

const CATEGORIES: &[&str] = &["forms", "blog", "shop", "dashboards", "cards"];
const TAGS: &[&str] = &["react", "vue", "tailwind", "charts", "realtime", "a11y"];
const LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];
const ACTIONS: &[BehaviorAction] = BehaviorAction::known();

fn details(i: usize) -> ItemDetails {
    ItemDetails::new()
        .with_category(CATEGORIES[i % CATEGORIES.len()])
        .with_complexity(LEVELS[i % LEVELS.len()])
        .with_tags([TAGS[i % TAGS.len()], TAGS[(i + 1) % TAGS.len()]])
}

fn sample_records(count: usize) -> Vec<BehaviorRecord> {
    (0..count)
        .map(|i| BehaviorRecord {
            id: i64::try_from(i).unwrap(),
            user_id: UserId::new(1),
            action: ACTIONS[i % ACTIONS.len()].clone(),
            item_type: ItemType::Template,
            item_id: format!("template-{i}"),
            item_details: details(i),
            timestamp: 1_700_000_000 + i as u64,
        })
        .collect()
}

fn populate(engine: &Engine, user: UserId, count: usize) {
    for i in 0..count {
        engine.recorder().record_action(
            user,
            ACTIONS[i % ACTIONS.len()].clone(),
            ItemType::Template,
            format!("template-{i}"),
            Some(details(i)),
        );
    }
}

fn bench_tally(c: &mut Criterion) {
    let mut group = c.benchmark_group("tally");

    for size in [10, 50, 500] {
        let records = sample_records(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| {
                let tally = PreferenceTally::from_records(black_box(records));
                tally.snapshot(UserId::new(1), 5, 10, 0)
            });
        });
    }

    group.finish();
}

fn bench_recompute(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = StencilConfig::default().with_data_dir(temp_dir.path());
    let engine = Engine::open(&config).expect("Failed to open engine");
    let user = UserId::new(1);
    populate(&engine, user, 200);

    let mut group = c.benchmark_group("recompute");
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("file_backed_200_records", |b| {
        b.iter(|| {
            engine
                .aggregator()
                .recompute_preferences(black_box(user))
                .expect("history exists")
        });
    });
    group.finish();
}

fn bench_suggestions(c: &mut Criterion) {
    let engine = Engine::in_memory(StencilConfig::default()).expect("Failed to open engine");
    let user = UserId::new(1);
    populate(&engine, user, 50);
    engine
        .aggregator()
        .recompute_preferences(user)
        .expect("history exists");

    let mut group = c.benchmark_group("suggestions");
    for limit in [5, 20] {
        let request = SuggestionRequest::new(limit);
        group.bench_with_input(BenchmarkId::from_parameter(limit), &request, |b, request| {
            b.iter(|| engine.composer().get_suggestions(user, black_box(request)));
        });
    }

    group.bench_function("new_user_defaults", |b| {
        let request = SuggestionRequest::default();
        b.iter(|| engine.composer().get_suggestions(UserId::new(2), &request));
    });
    group.finish();
}

criterion_group!(benches, bench_tally, bench_recompute, bench_suggestions);
criterion_main!(benches);
