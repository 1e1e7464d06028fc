//! Scan aggregation benchmarks

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::sync::Arc;

use coaster_admin::analytics::{
    AnalyticsFilter, DeviceType, EventAggregator, SampleEventSource, ScanEvent,
};
use coaster_admin::config::AnalyticsConfig;
use coaster_admin::services::CatalogService;
use coaster_admin::storage::{BeanCatalog, KeyValueStore, MemoryStore};
use coaster_admin::system::FixedClock;

fn setup(count: usize) -> (EventAggregator, BeanCatalog, Vec<ScanEvent>) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let clock = FixedClock::arc(Utc.with_ymd_and_hms(2024, 10, 15, 12, 0, 0).unwrap());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let catalog = rt
        .block_on(CatalogService::load(store, clock.clone()))
        .unwrap()
        .catalog();

    let aggregator = EventAggregator::from_config(&AnalyticsConfig::default(), clock.clone());
    let source = SampleEventSource::new(42, &catalog, aggregator.offset());
    let events = source.backfill(count, aggregator.now());
    (aggregator, catalog, events)
}

// ============== Summary ==============

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregator/summarize");

    for size in [1_000, 10_000, 50_000] {
        let (aggregator, catalog, events) = setup(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &events, |b, events| {
            b.iter(|| aggregator.summarize(events, &catalog, None));
        });
    }

    group.finish();
}

fn bench_summarize_filtered(c: &mut Criterion) {
    let (aggregator, catalog, events) = setup(10_000);
    let filter = AnalyticsFilter::new()
        .with_device_types([DeviceType::Mobile])
        .with_locations(["South Korea"]);

    c.bench_function("aggregator/summarize_filtered", |b| {
        b.iter(|| aggregator.summarize(&events, &catalog, Some(&filter)));
    });
}

// ============== Rankings ==============

fn bench_rankings(c: &mut Criterion) {
    let (aggregator, catalog, events) = setup(10_000);

    c.bench_function("aggregator/entity_performance", |b| {
        b.iter(|| aggregator.rank_entity_performance(&events, &catalog, None));
    });

    c.bench_function("aggregator/locations", |b| {
        b.iter(|| aggregator.rank_locations(&events, &catalog));
    });

    let now = aggregator.now();
    c.bench_function("aggregator/realtime", |b| {
        b.iter(|| aggregator.realtime_snapshot(&events, &catalog, now));
    });
}

criterion_group!(
    benches,
    bench_summarize,
    bench_summarize_filtered,
    bench_rankings
);
criterion_main!(benches);
