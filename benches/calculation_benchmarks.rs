//! Performance benchmarks for the leave engine.
//!
//! This benchmark suite covers:
//! - Leave days for a full year under one- and two-week patterns
//! - FIFO allocation over growing ledgers
//! - An expiry pass over a large ledger
//! - A leave-days request through the HTTP router
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use leave_engine::api::{AppState, create_router};
use leave_engine::calculation::{RotationAnchor, allocate_consumption, leave_days_for_period};
use leave_engine::config::ConfigLoader;
use leave_engine::models::{
    BalanceChange, BalanceChangeId, BalanceChangeType, NewBalanceChange, SourceRef, WorkPattern,
};
use leave_engine::services::ExpiryEngine;
use leave_engine::store::{InMemoryStore, LeaveStore};

use axum::{body::Body, http::Request};
use tower::ServiceExt;

fn create_test_config() -> ConfigLoader {
    ConfigLoader::load("./config/default").expect("Failed to load config")
}

/// Loads the seeded patterns: a five-day week and a two-week rotation.
fn seeded_patterns() -> Vec<WorkPattern> {
    let mut store = InMemoryStore::new();
    create_test_config()
        .seed_work_patterns(&mut store)
        .expect("Failed to seed patterns");
    store.load_work_patterns().expect("Failed to load patterns")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A ledger with yearly expiring carry-overs, an entitlement, and daily debits.
fn create_ledger(debits: usize) -> Vec<NewBalanceChange> {
    let source = SourceRef::entitlement(1);
    let start = date(2016, 1, 1);
    let mut entries = vec![
        NewBalanceChange::new(
            BalanceChangeType::BroughtForward,
            source,
            Decimal::new(10, 0),
            start.and_hms_opt(0, 0, 0).unwrap(),
        )
        .expiring_on(date(2016, 3, 31)),
        NewBalanceChange::new(
            BalanceChangeType::Entitlement,
            source,
            Decimal::new(debits as i64, 0),
            start.and_hms_opt(0, 0, 0).unwrap(),
        ),
    ];

    for i in 0..debits {
        let day = start + Duration::days((i % 365) as i64);
        entries.push(NewBalanceChange::new(
            BalanceChangeType::Debit,
            source,
            Decimal::new(-5, 1),
            day.and_hms_opt(9, 0, 0).unwrap(),
        ));
        if i % 30 == 0 {
            entries.push(
                NewBalanceChange::new(
                    BalanceChangeType::ToilAccrual,
                    source,
                    Decimal::ONE,
                    day.and_hms_opt(18, 0, 0).unwrap(),
                )
                .expiring_on(day + Duration::days(90)),
            );
        }
    }
    entries
}

/// Benchmark: leave days for one year under each seeded pattern.
fn bench_leave_days_for_year(c: &mut Criterion) {
    let patterns = seeded_patterns();
    let start = date(2016, 1, 1);
    let end = date(2016, 12, 31);

    let mut group = c.benchmark_group("leave_days_for_year");
    group.throughput(Throughput::Elements(366));

    for pattern in &patterns {
        group.bench_with_input(
            BenchmarkId::new("weeks", pattern.number_of_weeks()),
            pattern,
            |b, pattern| {
                b.iter(|| {
                    black_box(leave_days_for_period(
                        pattern,
                        start,
                        end,
                        start,
                        end,
                        RotationAnchor::CalendarWeek,
                    ))
                })
            },
        );
    }

    group.finish();
}

/// Benchmark: FIFO allocation to understand scaling behaviour.
fn bench_fifo_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fifo_allocation");

    for debits in [100usize, 1_000, 10_000].iter() {
        let entries: Vec<BalanceChange> = create_ledger(*debits)
            .into_iter()
            .enumerate()
            .map(|(i, e)| BalanceChange::from_new(BalanceChangeId(i as u64 + 1), e))
            .collect();

        group.throughput(Throughput::Elements(entries.len() as u64));
        group.bench_with_input(BenchmarkId::new("debits", debits), &entries, |b, entries| {
            b.iter(|| black_box(allocate_consumption(entries).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark: one expiry pass over a ledger of ten thousand debits.
fn bench_expiry_pass(c: &mut Criterion) {
    let source = SourceRef::entitlement(1);
    let mut store = InMemoryStore::new();
    store.register_source(source);
    for entry in create_ledger(10_000) {
        store.append_ledger_entry(entry).unwrap();
    }

    let mut group = c.benchmark_group("expiry");
    group.sample_size(20);

    group.bench_function("expire_as_of_10000", |b| {
        b.iter_batched(
            || store.clone(),
            |mut store| {
                let created = ExpiryEngine::new(&mut store)
                    .expire_as_of(source, date(2017, 1, 1))
                    .unwrap();
                black_box(created)
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

/// Benchmark: leave days for a year through the HTTP router.
fn bench_leave_days_request(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let state = AppState::new(create_test_config()).unwrap();
    let router = create_router(state);
    let body = serde_json::json!({
        "reference_start": "2016-01-01",
        "reference_end": "2016-12-31",
        "from": "2016-01-01",
        "to": "2016-12-31"
    })
    .to_string();

    c.bench_function("leave_days_request", |b| {
        b.to_async(&rt).iter(|| async {
            let router = router.clone();
            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/work-patterns/2/leave-days")
                        .header("Content-Type", "application/json")
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });
}

criterion_group!(
    benches,
    bench_leave_days_for_year,
    bench_fifo_allocation,
    bench_expiry_pass,
    bench_leave_days_request,
);
criterion_main!(benches);
