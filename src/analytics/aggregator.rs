//! Dashboard summaries over the scan-event log
//!
//! All operations are read-only over their input slice. Ranked lists keep the
//! first-encountered order among equal counts, and every percentage is
//! `count / total * 100` with a zero total short-circuiting to 0.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::Serialize;
use strum::AsRefStr;
use tracing::{debug, trace, warn};

use super::{AnalyticsFilter, DeviceType, ScanEvent};
use crate::config::AnalyticsConfig;
use crate::storage::BeanCatalog;
use crate::system::Clock;

/// Entities per location in [`LocationAnalytics::top_entities`]
pub const LOCATION_TOP_ENTITIES: usize = 5;
/// Events returned in [`RealtimeStats::recent_scans`]
pub const RECENT_SCANS: usize = 10;
/// Days averaged over in [`EntityPerformance::average_scans_per_day`]
pub const AVERAGE_WINDOW_DAYS: i64 = 30;
/// Length of each of the two trend windows
pub const TREND_WINDOW_DAYS: i64 = 7;
/// Relative change (percent) beyond which a trend is not `stable`
pub const TREND_THRESHOLD: f64 = 5.0;

const HOURS: usize = 24;

// ============ Outputs ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    /// Weekday short name, e.g. `Mon`
    pub day: String,
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEntity {
    #[serde(rename = "beanId")]
    pub entity_id: String,
    #[serde(rename = "beanName")]
    pub entity_name: String,
    pub scan_count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopLocation {
    pub country: String,
    pub city: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    pub mobile: usize,
    pub desktop: usize,
    pub tablet: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanAnalytics {
    pub total_scans: usize,
    pub unique_scans: usize,
    pub scans_by_hour: Vec<HourCount>,
    pub scans_by_day: Vec<DayCount>,
    #[serde(rename = "topBeans")]
    pub top_entities: Vec<TopEntity>,
    pub top_locations: Vec<TopLocation>,
    pub device_stats: DeviceStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPerformance {
    #[serde(rename = "beanId")]
    pub entity_id: String,
    #[serde(rename = "beanName")]
    pub entity_name: String,
    pub total_scans: usize,
    pub unique_scans: usize,
    pub average_scans_per_day: f64,
    pub peak_hour: u32,
    /// `H:00`
    pub peak_scan_time: String,
    #[serde(rename = "popularityTrend")]
    pub trend: Trend,
    pub trend_percentage: f64,
    pub last_scan_date: Option<DateTime<Utc>>,
    /// Price × total scans × 0.1; 0 for beans without sale info
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEntityCount {
    #[serde(rename = "beanName")]
    pub entity_name: String,
    pub scan_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAnalytics {
    pub country: String,
    pub city: String,
    pub total_scans: usize,
    pub unique_users: usize,
    #[serde(rename = "topBeans")]
    pub top_entities: Vec<LocationEntityCount>,
    pub time_distribution: Vec<HourCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStats {
    pub scans_in_last_hour: usize,
    pub scans_in_last_day: usize,
    /// Name of the most-scanned bean in the last 24 hours, `N/A` when none
    #[serde(rename = "topScanningBean")]
    pub top_scanning_entity: String,
    pub recent_scans: Vec<ScanEvent>,
    pub generated_at: DateTime<Utc>,
}

// ============ Aggregator ============

/// Computes the analytics summaries
///
/// Hour-of-day and calendar-day buckets use `offset` as the local time zone.
/// Trailing windows are measured back from the injected clock.
pub struct EventAggregator {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    top_n: usize,
}

impl EventAggregator {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset, top_n: usize) -> Self {
        Self {
            clock,
            offset,
            top_n,
        }
    }

    /// Build from config; an out-of-range UTC offset falls back to UTC
    pub fn from_config(config: &AnalyticsConfig, clock: Arc<dyn Clock>) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| {
                warn!(
                    "Invalid utc_offset_minutes {}, using UTC",
                    config.utc_offset_minutes
                );
                Utc.fix()
            });
        Self::new(clock, offset, config.top_n)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn local_hour(&self, at: DateTime<Utc>) -> u32 {
        at.with_timezone(&self.offset).hour()
    }

    fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    fn hour_histogram<'a>(&self, events: impl IntoIterator<Item = &'a ScanEvent>) -> Vec<HourCount> {
        let mut buckets = [0usize; HOURS];
        for event in events {
            buckets[self.local_hour(event.timestamp) as usize] += 1;
        }
        buckets
            .iter()
            .enumerate()
            .map(|(hour, &count)| HourCount {
                hour: hour as u32,
                count,
            })
            .collect()
    }

    /// Filtered overview: totals, hour/day histograms, top entities and
    /// locations, device tally
    pub fn summarize(
        &self,
        events: &[ScanEvent],
        catalog: &BeanCatalog,
        filter: Option<&AnalyticsFilter>,
    ) -> ScanAnalytics {
        let filtered: Vec<&ScanEvent> = match filter {
            Some(f) => f.apply(events),
            None => events.iter().collect(),
        };
        let total = filtered.len();
        debug!(
            "Aggregator: summarizing {} of {} events",
            total,
            events.len()
        );

        let unique_scans = filtered
            .iter()
            .map(|e| e.session_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let scans_by_hour = self.hour_histogram(filtered.iter().copied());
        let scans_by_day = self.trailing_days(&filtered);

        let top_entities = ranked_counts(filtered.iter().map(|e| e.entity_id.as_str()))
            .into_iter()
            .take(self.top_n)
            .map(|(id, count)| TopEntity {
                entity_id: id.to_string(),
                entity_name: catalog.name_of(id),
                scan_count: count,
                percentage: percentage(count, total),
            })
            .collect();

        let top_locations = ranked_counts(
            filtered
                .iter()
                .filter_map(|e| e.location.as_ref())
                .map(|l| (l.country.as_str(), l.city.as_str())),
        )
        .into_iter()
        .take(self.top_n)
        .map(|((country, city), count)| TopLocation {
            country: country.to_string(),
            city: city.to_string(),
            count,
            percentage: percentage(count, total),
        })
        .collect();

        let mut device_stats = DeviceStats::default();
        for event in &filtered {
            match event.device_type() {
                Some(DeviceType::Mobile) => device_stats.mobile += 1,
                Some(DeviceType::Desktop) => device_stats.desktop += 1,
                Some(DeviceType::Tablet) => device_stats.tablet += 1,
                Some(DeviceType::Unknown) | None => {}
            }
        }

        ScanAnalytics {
            total_scans: total,
            unique_scans,
            scans_by_hour,
            scans_by_day,
            top_entities,
            top_locations,
            device_stats,
        }
    }

    /// Counts for today and the six days before it, oldest first
    fn trailing_days(&self, events: &[&ScanEvent]) -> Vec<DayCount> {
        let today = self.local_date(self.clock.now());
        let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
        for event in events {
            *per_day.entry(self.local_date(event.timestamp)).or_default() += 1;
        }

        (0..TREND_WINDOW_DAYS)
            .rev()
            .map(|back| {
                let date = today - Duration::days(back);
                DayCount {
                    day: date.format("%a").to_string(),
                    date,
                    count: per_day.get(&date).copied().unwrap_or(0),
                }
            })
            .collect()
    }

    /// Per-entity totals, peak hour and week-over-week trend
    ///
    /// Covers every catalog entity in catalog order, or only `entity_id` when
    /// given (empty when that id is not in the catalog).
    pub fn rank_entity_performance(
        &self,
        events: &[ScanEvent],
        catalog: &BeanCatalog,
        entity_id: Option<&str>,
    ) -> Vec<EntityPerformance> {
        let now = self.clock.now();
        let mut by_entity: HashMap<&str, Vec<&ScanEvent>> = HashMap::new();
        for event in events {
            by_entity
                .entry(event.entity_id.as_str())
                .or_default()
                .push(event);
        }

        let result: Vec<EntityPerformance> = catalog
            .beans()
            .iter()
            .filter(|bean| entity_id.is_none_or(|id| bean.id == id))
            .map(|bean| {
                let scans = by_entity
                    .get(bean.id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                self.entity_performance(bean.id.as_str(), &bean.name, bean.price(), scans, now)
            })
            .collect();

        debug!(
            "Aggregator: computed performance for {} entities",
            result.len()
        );
        result
    }

    fn entity_performance(
        &self,
        id: &str,
        name: &str,
        price: f64,
        scans: &[&ScanEvent],
        now: DateTime<Utc>,
    ) -> EntityPerformance {
        let total_scans = scans.len();
        let unique_scans = scans
            .iter()
            .map(|e| e.session_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let window = Duration::days(TREND_WINDOW_DAYS);
        let mut recent = 0usize;
        let mut prior = 0usize;
        let mut last_30_days = 0usize;
        for event in scans {
            let age = now - event.timestamp;
            if age < Duration::zero() {
                continue;
            }
            if age <= window {
                recent += 1;
            } else if age <= window * 2 {
                prior += 1;
            }
            if age <= Duration::days(AVERAGE_WINDOW_DAYS) {
                last_30_days += 1;
            }
        }
        let (trend, trend_percentage) = classify_trend(recent, prior);
        trace!(
            "Aggregator: {} recent={} prior={} trend={}",
            id,
            recent,
            prior,
            trend.as_ref()
        );

        let histogram = self.hour_histogram(scans.iter().copied());
        let peak_hour = histogram
            .iter()
            .fold(histogram[0], |max, h| if h.count > max.count { *h } else { max })
            .hour;

        EntityPerformance {
            entity_id: id.to_string(),
            entity_name: name.to_string(),
            total_scans,
            unique_scans,
            average_scans_per_day: last_30_days as f64 / AVERAGE_WINDOW_DAYS as f64,
            peak_hour,
            peak_scan_time: format!("{}:00", peak_hour),
            trend,
            trend_percentage,
            last_scan_date: scans.iter().map(|e| e.timestamp).max(),
            revenue: price * total_scans as f64 * 0.1,
        }
    }

    /// Per `country+city`: totals, unique sessions, top-5 entities and hour
    /// distribution, busiest location first
    pub fn rank_locations(
        &self,
        events: &[ScanEvent],
        catalog: &BeanCatalog,
    ) -> Vec<LocationAnalytics> {
        let mut order: Vec<(&str, &str)> = Vec::new();
        let mut groups: HashMap<(&str, &str), Vec<&ScanEvent>> = HashMap::new();
        for event in events {
            let Some(location) = &event.location else {
                continue;
            };
            let key = (location.country.as_str(), location.city.as_str());
            groups
                .entry(key)
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(event);
        }

        let mut result: Vec<LocationAnalytics> = order
            .into_iter()
            .map(|key| {
                let group = groups.remove(&key).unwrap_or_default();
                let unique_users = group
                    .iter()
                    .map(|e| e.session_id.as_str())
                    .collect::<HashSet<_>>()
                    .len();
                let top_entities = ranked_counts(group.iter().map(|e| e.entity_id.as_str()))
                    .into_iter()
                    .take(LOCATION_TOP_ENTITIES)
                    .map(|(id, count)| LocationEntityCount {
                        entity_name: catalog.name_of(id),
                        scan_count: count,
                    })
                    .collect();

                LocationAnalytics {
                    country: key.0.to_string(),
                    city: key.1.to_string(),
                    total_scans: group.len(),
                    unique_users,
                    top_entities,
                    time_distribution: self.hour_histogram(group.iter().copied()),
                }
            })
            .collect();

        // stable: ties keep first-encountered order
        result.sort_by(|a, b| b.total_scans.cmp(&a.total_scans));
        debug!("Aggregator: ranked {} locations", result.len());
        result
    }

    /// Activity in the trailing hour and day relative to `now`
    pub fn realtime_snapshot(
        &self,
        events: &[ScanEvent],
        catalog: &BeanCatalog,
        now: DateTime<Utc>,
    ) -> RealtimeStats {
        let hour_ago = now - Duration::hours(1);
        let day_ago = now - Duration::hours(24);

        let scans_in_last_hour = events.iter().filter(|e| e.timestamp >= hour_ago).count();
        let last_day: Vec<&ScanEvent> = events.iter().filter(|e| e.timestamp >= day_ago).collect();

        let top_scanning_entity = ranked_counts(last_day.iter().map(|e| e.entity_id.as_str()))
            .first()
            .and_then(|(id, _)| catalog.get(id))
            .map(|bean| bean.name.clone())
            .unwrap_or_else(|| "N/A".to_string());

        let mut recent: Vec<&ScanEvent> = events.iter().collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let recent_scans = recent.into_iter().take(RECENT_SCANS).cloned().collect();

        RealtimeStats {
            scans_in_last_hour,
            scans_in_last_day: last_day.len(),
            top_scanning_entity,
            recent_scans,
            generated_at: now,
        }
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// `(+/- relative change %)` classification; stable at 0 when `prior == 0`
fn classify_trend(recent: usize, prior: usize) -> (Trend, f64) {
    if prior == 0 {
        return (Trend::Stable, 0.0);
    }
    let change = (recent as f64 - prior as f64) / prior as f64 * 100.0;
    let trend = if change > TREND_THRESHOLD {
        Trend::Increasing
    } else if change < -TREND_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    };
    (trend, change.abs())
}

/// Occurrence counts, descending, ties in first-seen order
fn ranked_counts<K, I>(keys: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Copy,
    I: IntoIterator<Item = K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for key in keys {
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key, counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
