//! Analytics service and realtime feed tests

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use coaster_admin::analytics::{
    AnalyticsFilter, DeviceType, EventSource, Location, RealtimeFeed, SampleEventSource, ScanEvent,
};
use coaster_admin::config::AnalyticsConfig;
use coaster_admin::errors::Result;
use coaster_admin::services::{AnalyticsService, CatalogService, ScanMetadata};
use coaster_admin::storage::{KeyValueStore, MemoryStore};
use coaster_admin::system::FixedClock;

const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
                         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 15, 12, 0, 0).unwrap()
}

struct Fixture {
    clock: Arc<FixedClock>,
    catalog: Arc<CatalogService>,
    analytics: Arc<AnalyticsService>,
}

async fn fixture(config: AnalyticsConfig) -> Fixture {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let clock = FixedClock::arc(start());
    let catalog = Arc::new(
        CatalogService::load(store.clone(), clock.clone())
            .await
            .unwrap(),
    );
    let analytics = Arc::new(
        AnalyticsService::load(store, &config, clock.clone())
            .await
            .unwrap(),
    );
    Fixture {
        clock,
        catalog,
        analytics,
    }
}

/// Hands out one queued batch per poll
struct ScriptedSource {
    batches: Mutex<Vec<Vec<ScanEvent>>>,
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn poll(&self, _now: DateTime<Utc>) -> Result<Vec<ScanEvent>> {
        let mut batches = self.batches.lock();
        Ok(if batches.is_empty() {
            Vec::new()
        } else {
            batches.remove(0)
        })
    }
}

fn live_scan(id: &str, entity: &str, at: DateTime<Utc>) -> ScanEvent {
    ScanEvent {
        id: id.to_string(),
        chip_id: "NFC002".to_string(),
        entity_id: entity.to_string(),
        timestamp: at,
        location: Some(Location::new("Korea", "Seoul")),
        device: None,
        user_agent: None,
        referrer: None,
        session_id: format!("session-{}", id),
    }
}

#[tokio::test]
async fn test_recorded_scans_feed_the_summary() {
    let fx = fixture(AnalyticsConfig::default()).await;
    fx.analytics
        .record_scan(
            "NFC002",
            "2",
            ScanMetadata {
                location: Some(Location::new("Korea", "Seoul")),
                user_agent: Some(IPHONE_UA.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    fx.clock.advance(Duration::minutes(5));
    fx.analytics
        .record_scan("NFC001", "1", ScanMetadata::default())
        .await
        .unwrap();

    let catalog = fx.catalog.catalog();
    let summary = fx.analytics.summary(&catalog, None);
    assert_eq!(summary.total_scans, 2);
    assert_eq!(summary.unique_scans, 2);
    assert_eq!(summary.device_stats.mobile, 1);
    assert_eq!(summary.top_locations.len(), 1);

    let mobile_only = AnalyticsFilter::new().with_device_types([DeviceType::Mobile]);
    let filtered = fx.analytics.summary(&catalog, Some(&mobile_only));
    assert_eq!(filtered.total_scans, 1);
    assert_eq!(filtered.top_entities[0].entity_name, "Geisha Panama");
}

#[tokio::test]
async fn test_seeded_samples_are_reproducible() {
    let a = fixture(AnalyticsConfig::default()).await;
    let b = fixture(AnalyticsConfig::default()).await;
    let offset = a.analytics.aggregator().offset();

    let source_a = SampleEventSource::new(9, &a.catalog.catalog(), offset);
    let source_b = SampleEventSource::new(9, &b.catalog.catalog(), offset);
    assert_eq!(a.analytics.seed_samples(&source_a, 200).await.unwrap(), 200);
    assert_eq!(b.analytics.seed_samples(&source_b, 200).await.unwrap(), 200);

    assert_eq!(a.analytics.events(), b.analytics.events());
    assert!(a.analytics.events().iter().all(|e| e.timestamp <= start()));

    // a second seed leaves a non-empty log alone
    assert_eq!(a.analytics.seed_samples(&source_a, 200).await.unwrap(), 0);
    assert_eq!(a.analytics.len(), 200);
}

#[tokio::test]
async fn test_log_is_bounded() {
    let config = AnalyticsConfig {
        event_capacity: 100,
        ..Default::default()
    };
    let fx = fixture(config).await;
    let source = SampleEventSource::new(1, &fx.catalog.catalog(), fx.analytics.aggregator().offset());
    fx.analytics.seed_samples(&source, 250).await.unwrap();

    let events = fx.analytics.events();
    assert_eq!(events.len(), 100);
}

#[tokio::test]
async fn test_entity_performance_and_locations() {
    let fx = fixture(AnalyticsConfig::default()).await;
    let events = vec![
        live_scan("a", "2", start() - Duration::days(1)),
        live_scan("b", "2", start() - Duration::days(2)),
        live_scan("c", "1", start() - Duration::days(9)),
    ];
    fx.analytics.ingest(events).await.unwrap();

    let catalog = fx.catalog.catalog();
    let performance = fx.analytics.entity_performance(&catalog, Some("2"));
    assert_eq!(performance.len(), 1);
    assert_eq!(performance[0].total_scans, 2);
    // price 120000 * 2 scans * 0.1
    assert!((performance[0].revenue - 24000.0).abs() < 1e-6);

    let locations = fx.analytics.location_analytics(&catalog);
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].total_scans, 3);
    assert_eq!(locations[0].top_entities[0].entity_name, "Geisha Panama");
}

#[tokio::test]
async fn test_realtime_tick_ingests_polled_events() {
    let fx = fixture(AnalyticsConfig::default()).await;
    let source = Arc::new(ScriptedSource {
        batches: Mutex::new(vec![vec![live_scan("live-1", "2", start())]]),
    });
    let feed = RealtimeFeed::new(
        fx.analytics.clone(),
        fx.catalog.clone(),
        source,
        StdDuration::from_secs(5),
    );

    assert_eq!(feed.snapshot().scans_in_last_hour, 0);
    let stats = feed.tick().await.unwrap();
    assert_eq!(stats.scans_in_last_hour, 1);
    assert_eq!(stats.top_scanning_entity, "Geisha Panama");
    assert_eq!(fx.analytics.len(), 1);

    let quiet = feed.tick().await.unwrap();
    assert_eq!(quiet.scans_in_last_hour, 1);
}

#[tokio::test]
async fn test_realtime_feed_publishes_latest_snapshot() {
    let fx = fixture(AnalyticsConfig::default()).await;
    let source = Arc::new(ScriptedSource {
        batches: Mutex::new(vec![
            vec![live_scan("live-1", "2", start())],
            vec![live_scan("live-2", "1", start())],
        ]),
    });
    let feed = RealtimeFeed::new(
        fx.analytics.clone(),
        fx.catalog.clone(),
        source,
        StdDuration::from_millis(20),
    );

    let (mut rx, handle) = feed.spawn();
    assert_eq!(rx.borrow().scans_in_last_hour, 0);

    // watch keeps only the latest value, so intermediate snapshots may be skipped
    let mut seen = Vec::new();
    tokio::time::timeout(StdDuration::from_secs(5), async {
        while seen.last() != Some(&2) {
            rx.changed().await.unwrap();
            seen.push(rx.borrow_and_update().scans_in_last_hour);
        }
    })
    .await
    .unwrap();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(fx.analytics.len(), 2);

    drop(rx);
    handle.abort();
}
