//! Aggregator integration tests: summaries, trends, locations, realtime window

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

use coaster_admin::analytics::{
    AnalyticsFilter, DeviceInfo, DeviceStats, DeviceType, EventAggregator, Location, ScanEvent,
    Trend,
};
use coaster_admin::storage::{BeanCatalog, CoffeeBean};
use coaster_admin::system::FixedClock;

// =============================================================================
// Fixtures
// =============================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 15, 12, 0, 0).unwrap()
}

fn aggregator_at(at: DateTime<Utc>) -> EventAggregator {
    EventAggregator::new(FixedClock::arc(at), FixedOffset::east_opt(0).unwrap(), 10)
}

fn catalog() -> BeanCatalog {
    let mut geisha = CoffeeBean::new("1", "Geisha Panama", now());
    geisha.origin = "Panama".to_string();
    let sidamo = CoffeeBean::new("2", "Sidamo", now());
    let kenya = CoffeeBean::new("3", "Kenya AA", now());
    BeanCatalog::new(vec![geisha, sidamo, kenya])
}

fn scan(n: usize, entity: &str, at: DateTime<Utc>) -> ScanEvent {
    ScanEvent {
        id: format!("scan-{}", n),
        chip_id: format!("NFC-{}", entity),
        entity_id: entity.to_string(),
        timestamp: at,
        location: None,
        device: None,
        user_agent: None,
        referrer: None,
        session_id: format!("session-{}", n),
    }
}

fn with_device(mut event: ScanEvent, device_type: DeviceType) -> ScanEvent {
    event.device = Some(DeviceInfo {
        device_type,
        os: String::new(),
        browser: String::new(),
    });
    event
}

fn with_location(mut event: ScanEvent, country: &str, city: &str) -> ScanEvent {
    event.location = Some(Location::new(country, city));
    event
}

// =============================================================================
// summarize
// =============================================================================

#[cfg(test)]
mod summarize_tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_neutral_summary() {
        let summary = aggregator_at(now()).summarize(&[], &catalog(), None);

        assert_eq!(summary.total_scans, 0);
        assert_eq!(summary.unique_scans, 0);
        assert!(summary.top_entities.is_empty());
        assert!(summary.top_locations.is_empty());
        assert_eq!(summary.device_stats, DeviceStats::default());
        assert_eq!(summary.scans_by_hour.len(), 24);
        assert!(summary.scans_by_hour.iter().all(|h| h.count == 0));
        assert_eq!(summary.scans_by_day.len(), 7);
    }

    #[test]
    fn test_device_tally() {
        let t = now() - Duration::hours(1);
        let events = vec![
            with_device(scan(1, "1", t), DeviceType::Mobile),
            with_device(scan(2, "1", t), DeviceType::Mobile),
            with_device(scan(3, "2", t), DeviceType::Mobile),
            with_device(scan(4, "2", t), DeviceType::Desktop),
            with_device(scan(5, "3", t), DeviceType::Desktop),
        ];
        let summary = aggregator_at(now()).summarize(&events, &catalog(), None);

        assert_eq!(summary.total_scans, 5);
        assert_eq!(
            summary.device_stats,
            DeviceStats {
                mobile: 3,
                desktop: 2,
                tablet: 0
            }
        );
    }

    #[test]
    fn test_unknown_devices_are_counted_nowhere() {
        let t = now() - Duration::hours(1);
        let events = vec![
            with_device(scan(1, "1", t), DeviceType::Unknown),
            scan(2, "1", t),
        ];
        let summary = aggregator_at(now()).summarize(&events, &catalog(), None);
        assert_eq!(summary.total_scans, 2);
        assert_eq!(summary.device_stats, DeviceStats::default());
    }

    #[test]
    fn test_unique_scans_count_distinct_sessions() {
        let t = now() - Duration::hours(2);
        let mut a = scan(1, "1", t);
        let mut b = scan(2, "2", t);
        a.session_id = "same".to_string();
        b.session_id = "same".to_string();
        let events = vec![a, b, scan(3, "1", t)];

        let summary = aggregator_at(now()).summarize(&events, &catalog(), None);
        assert_eq!(summary.total_scans, 3);
        assert_eq!(summary.unique_scans, 2);
    }

    #[test]
    fn test_top_entities_percentages_and_tie_order() {
        let t = now() - Duration::hours(3);
        let events = vec![
            scan(1, "2", t),
            scan(2, "1", t),
            scan(3, "1", t),
            scan(4, "2", t),
            scan(5, "3", t),
        ];
        let summary = aggregator_at(now()).summarize(&events, &catalog(), None);

        let ids: Vec<&str> = summary
            .top_entities
            .iter()
            .map(|e| e.entity_id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
        assert_eq!(summary.top_entities[0].entity_name, "Sidamo");
        assert!((summary.top_entities[0].percentage - 40.0).abs() < 1e-9);
        assert!((summary.top_entities[2].percentage - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_locations_never_exceed_total() {
        let t = now() - Duration::hours(1);
        let events = vec![
            with_location(scan(1, "1", t), "Korea", "Seoul"),
            with_location(scan(2, "1", t), "Korea", "Seoul"),
            with_location(scan(3, "2", t), "Korea", "Busan"),
            with_location(scan(4, "3", t), "Japan", "Tokyo"),
            scan(5, "3", t),
        ];
        let summary = aggregator_at(now()).summarize(&events, &catalog(), None);

        let located: usize = summary.top_locations.iter().map(|l| l.count).sum();
        assert!(located <= summary.total_scans);
        for location in &summary.top_locations {
            let expected = location.count as f64 / summary.total_scans as f64 * 100.0;
            assert!((location.percentage - expected).abs() < 1e-9);
        }
        assert_eq!(summary.top_locations[0].city, "Seoul");
        assert_eq!(summary.top_locations[0].count, 2);
    }

    #[test]
    fn test_hour_buckets_use_local_offset() {
        let at = Utc.with_ymd_and_hms(2024, 10, 15, 1, 30, 0).unwrap();
        let seoul = FixedOffset::east_opt(9 * 3600).unwrap();
        let aggregator = EventAggregator::new(FixedClock::arc(now()), seoul, 10);

        let summary = aggregator.summarize(&[scan(1, "1", at)], &catalog(), None);
        assert_eq!(summary.scans_by_hour[10].count, 1);
    }

    #[test]
    fn test_trailing_days_oldest_first() {
        let events = vec![
            scan(1, "1", now() - Duration::days(6)),
            scan(2, "1", now()),
            scan(3, "1", now()),
            scan(4, "1", now() - Duration::days(20)),
        ];
        let summary = aggregator_at(now()).summarize(&events, &catalog(), None);

        let counts: Vec<usize> = summary.scans_by_day.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![1, 0, 0, 0, 0, 0, 2]);
        assert_eq!(summary.scans_by_day[6].day, "Tue");
    }

    #[test]
    fn test_filter_is_applied_before_aggregation() {
        let events = vec![
            with_device(scan(1, "1", now() - Duration::days(1)), DeviceType::Mobile),
            with_device(scan(2, "2", now() - Duration::days(1)), DeviceType::Desktop),
            with_device(scan(3, "1", now() - Duration::days(10)), DeviceType::Mobile),
        ];
        let filter = AnalyticsFilter::new()
            .with_date_range(now() - Duration::days(7), now())
            .with_entities(["1"]);

        let summary = aggregator_at(now()).summarize(&events, &catalog(), Some(&filter));
        assert_eq!(summary.total_scans, 1);
        assert_eq!(summary.device_stats.mobile, 1);
        assert_eq!(summary.device_stats.desktop, 0);
    }

    #[test]
    fn test_inverted_range_yields_empty_summary() {
        let events = vec![scan(1, "1", now() - Duration::days(1))];
        let filter = AnalyticsFilter::new().with_date_range(now(), now() - Duration::days(7));

        let summary = aggregator_at(now()).summarize(&events, &catalog(), Some(&filter));
        assert_eq!(summary.total_scans, 0);
        assert!(summary.top_entities.is_empty());
    }
}

// =============================================================================
// rank_entity_performance
// =============================================================================

#[cfg(test)]
mod performance_tests {
    use super::*;

    #[test]
    fn test_week_over_week_increase() {
        let mut events = Vec::new();
        for i in 0..10 {
            events.push(scan(i, "1", now() - Duration::hours(12 + i as i64 * 14)));
        }
        for i in 0..5 {
            events.push(scan(100 + i, "1", now() - Duration::days(8 + i as i64)));
        }

        let ranking = aggregator_at(now()).rank_entity_performance(&events, &catalog(), Some("1"));
        assert_eq!(ranking.len(), 1);
        let perf = &ranking[0];
        assert_eq!(perf.total_scans, 15);
        assert_eq!(perf.trend, Trend::Increasing);
        assert!((perf.trend_percentage - 100.0).abs() < 1e-9);
        assert!((perf.average_scans_per_day - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_prior_scans_is_stable() {
        let events = vec![scan(1, "2", now() - Duration::days(1))];
        let ranking = aggregator_at(now()).rank_entity_performance(&events, &catalog(), Some("2"));
        assert_eq!(ranking[0].trend, Trend::Stable);
        assert_eq!(ranking[0].trend_percentage, 0.0);
    }

    #[test]
    fn test_decrease_beyond_threshold() {
        let mut events = Vec::new();
        for i in 0..4 {
            events.push(scan(i, "3", now() - Duration::days(1)));
        }
        for i in 0..8 {
            events.push(scan(10 + i, "3", now() - Duration::days(10)));
        }
        let ranking = aggregator_at(now()).rank_entity_performance(&events, &catalog(), Some("3"));
        assert_eq!(ranking[0].trend, Trend::Decreasing);
        assert!((ranking[0].trend_percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_peak_hour_first_on_tie() {
        let day = Utc.with_ymd_and_hms(2024, 10, 14, 0, 0, 0).unwrap();
        let events = vec![
            scan(1, "1", day + Duration::hours(15)),
            scan(2, "1", day + Duration::hours(9)),
        ];
        let ranking = aggregator_at(now()).rank_entity_performance(&events, &catalog(), Some("1"));
        assert_eq!(ranking[0].peak_hour, 9);
        assert_eq!(ranking[0].peak_scan_time, "9:00");
    }

    #[test]
    fn test_every_catalog_entity_is_reported() {
        let events = vec![scan(1, "1", now())];
        let ranking = aggregator_at(now()).rank_entity_performance(&events, &catalog(), None);
        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking[1].total_scans, 0);
        assert!(ranking[1].last_scan_date.is_none());

        let missing = aggregator_at(now()).rank_entity_performance(&events, &catalog(), Some("404"));
        assert!(missing.is_empty());
    }
}

// =============================================================================
// rank_locations / realtime_snapshot
// =============================================================================

#[cfg(test)]
mod location_and_realtime_tests {
    use super::*;

    #[test]
    fn test_locations_sorted_by_total() {
        let t = now() - Duration::hours(1);
        let events = vec![
            with_location(scan(1, "1", t), "Japan", "Tokyo"),
            with_location(scan(2, "1", t), "Korea", "Seoul"),
            with_location(scan(3, "2", t), "Korea", "Seoul"),
            scan(4, "2", t),
        ];
        let ranked = aggregator_at(now()).rank_locations(&events, &catalog());

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].city, "Seoul");
        assert_eq!(ranked[0].total_scans, 2);
        assert_eq!(ranked[0].unique_users, 2);
        assert_eq!(ranked[0].top_entities.len(), 2);
        assert_eq!(ranked[0].time_distribution.len(), 24);
        assert_eq!(ranked[1].city, "Tokyo");
    }

    #[test]
    fn test_realtime_windows() {
        let t = now();
        let events = vec![
            scan(1, "1", t - Duration::minutes(30)),
            scan(2, "2", t - Duration::hours(2)),
            scan(3, "3", t - Duration::hours(25)),
        ];
        let stats = aggregator_at(t).realtime_snapshot(&events, &catalog(), t);

        assert_eq!(stats.scans_in_last_hour, 1);
        assert_eq!(stats.scans_in_last_day, 2);
        assert_eq!(stats.top_scanning_entity, "Geisha Panama");
        assert_eq!(stats.recent_scans.len(), 3);
        assert_eq!(stats.recent_scans[0].id, "scan-1");
        assert_eq!(stats.recent_scans[2].id, "scan-3");
    }

    #[test]
    fn test_realtime_without_recent_activity() {
        let t = now();
        let events = vec![scan(1, "1", t - Duration::days(3))];
        let stats = aggregator_at(t).realtime_snapshot(&events, &catalog(), t);
        assert_eq!(stats.scans_in_last_day, 0);
        assert_eq!(stats.top_scanning_entity, "N/A");
    }

    #[test]
    fn test_recent_scans_capped_at_ten() {
        let t = now();
        let events: Vec<ScanEvent> = (0..15)
            .map(|i| scan(i, "1", t - Duration::minutes(i as i64)))
            .collect();
        let stats = aggregator_at(t).realtime_snapshot(&events, &catalog(), t);
        assert_eq!(stats.recent_scans.len(), 10);
        assert!(
            stats
                .recent_scans
                .windows(2)
                .all(|w| w[0].timestamp >= w[1].timestamp)
        );
    }

    #[test]
    fn test_clock_drives_trailing_windows() {
        let clock = FixedClock::arc(now());
        let aggregator = EventAggregator::new(clock.clone(), FixedOffset::east_opt(0).unwrap(), 10);
        let events = vec![scan(1, "1", now() - Duration::days(2))];

        let before = aggregator.rank_entity_performance(&events, &catalog(), Some("1"));
        clock.advance(Duration::days(40));
        let after = aggregator.rank_entity_performance(&events, &catalog(), Some("1"));

        assert!(before[0].average_scans_per_day > 0.0);
        assert_eq!(after[0].average_scans_per_day, 0.0);
    }
}
