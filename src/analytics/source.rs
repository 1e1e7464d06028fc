//! Where new scan events come from
//!
//! [`SampleEventSource`] produces demo traffic from a seeded RNG: a 30-day
//! backfill concentrated in opening hours, plus an occasional live scan per
//! poll. Seeding makes both reproducible in tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use super::{Coordinates, DeviceInfo, DeviceType, Location, ScanEvent};
use crate::errors::Result;
use crate::storage::BeanCatalog;

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Events that arrived since the previous poll
    async fn poll(&self, now: DateTime<Utc>) -> Result<Vec<ScanEvent>>;
}

const CITIES: &[(&str, &[&str])] = &[
    ("South Korea", &["Seoul", "Busan", "Incheon", "Daegu"]),
    ("Japan", &["Tokyo", "Osaka", "Kyoto", "Yokohama"]),
    (
        "United States",
        &["New York", "Los Angeles", "Chicago", "San Francisco"],
    ),
    ("Germany", &["Berlin", "Munich", "Hamburg", "Frankfurt"]),
    ("France", &["Paris", "Lyon", "Marseille", "Toulouse"]),
    ("Australia", &["Sydney", "Melbourne", "Brisbane", "Perth"]),
];
const DEVICES: &[DeviceType] = &[DeviceType::Mobile, DeviceType::Desktop, DeviceType::Tablet];
const BROWSERS: &[&str] = &["Chrome", "Safari", "Firefox", "Edge"];
const OSES: &[&str] = &["iOS", "Android", "Windows", "macOS"];

const BACKFILL_DAYS: i64 = 30;
const SESSION_POOL: u32 = 1000;

/// Seeded demo traffic over the beans of a catalog
pub struct SampleEventSource {
    rng: Mutex<StdRng>,
    /// `(bean id, chip id)`
    beans: Vec<(String, String)>,
    offset: FixedOffset,
    /// Chance of one live scan per poll
    live_probability: f64,
}

impl SampleEventSource {
    pub fn new(seed: u64, catalog: &BeanCatalog, offset: FixedOffset) -> Self {
        let beans = catalog
            .beans()
            .iter()
            .map(|b| (b.id.clone(), b.nfc_chip_id.clone()))
            .collect();
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            beans,
            offset,
            live_probability: 0.3,
        }
    }

    pub fn with_live_probability(mut self, probability: f64) -> Self {
        self.live_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// `count` events spread over the 30 days before `now`
    ///
    /// 80% fall between 09:00 and 21:00 local time. No event lies after `now`.
    pub fn backfill(&self, count: usize, now: DateTime<Utc>) -> Vec<ScanEvent> {
        if self.beans.is_empty() {
            debug!("SampleEventSource: empty catalog, nothing to backfill");
            return Vec::new();
        }

        let mut rng = self.rng.lock();
        let local_today = now.with_timezone(&self.offset).date_naive();
        let mut events = Vec::with_capacity(count);

        for i in 0..count {
            let hour = if rng.random_bool(0.8) {
                rng.random_range(9..21)
            } else {
                rng.random_range(0..24)
            };
            let date = local_today - Duration::days(rng.random_range(0..BACKFILL_DAYS));
            let minute = rng.random_range(0..60);
            let second = rng.random_range(0..60);

            let mut timestamp = date
                .and_hms_opt(hour, minute, second)
                .and_then(|naive| self.offset.from_local_datetime(&naive).single())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(now);
            if timestamp > now {
                timestamp -= Duration::days(1);
            }

            let (country, cities) = pick(&mut rng, CITIES);
            let city = pick(&mut rng, cities);
            let location = Location {
                country: country.to_string(),
                city: city.to_string(),
                coordinates: Some(Coordinates {
                    lat: 37.5665 + (rng.random::<f64>() - 0.5) * 0.1,
                    lng: 126.9780 + (rng.random::<f64>() - 0.5) * 0.1,
                }),
            };
            let device = DeviceInfo {
                device_type: pick(&mut rng, DEVICES),
                os: pick(&mut rng, OSES).to_string(),
                browser: pick(&mut rng, BROWSERS).to_string(),
            };
            let session = rng.random_range(0..SESSION_POOL);
            let (bean_id, chip_id) = pick(&mut rng, &self.beans);

            events.push(ScanEvent {
                id: format!("scan-{}-{}", now.timestamp_millis(), i),
                chip_id,
                entity_id: bean_id,
                timestamp,
                location: Some(location),
                device: Some(device),
                user_agent: None,
                referrer: None,
                session_id: format!("session-{}", session),
            });
        }

        events.sort_by_key(|e| e.timestamp);
        debug!("SampleEventSource: generated {} backfill events", events.len());
        events
    }

    /// One mobile scan from Seoul, with the configured probability
    pub fn next_scan(&self, now: DateTime<Utc>) -> Option<ScanEvent> {
        if self.beans.is_empty() {
            return None;
        }
        let mut rng = self.rng.lock();
        if !rng.random_bool(self.live_probability) {
            trace!("SampleEventSource: no scan this tick");
            return None;
        }
        let (bean_id, chip_id) = pick(&mut rng, &self.beans);
        let millis = now.timestamp_millis();
        Some(ScanEvent {
            id: format!("scan-{}", millis),
            chip_id,
            entity_id: bean_id,
            timestamp: now,
            location: Some(Location::new("South Korea", "Seoul")),
            device: Some(DeviceInfo {
                device_type: DeviceType::Mobile,
                os: "iOS".to_string(),
                browser: "Safari".to_string(),
            }),
            user_agent: None,
            referrer: None,
            session_id: format!("session-{}", millis),
        })
    }
}

fn pick<T: Clone>(rng: &mut StdRng, items: &[T]) -> T {
    // callers guarantee non-empty slices
    items
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| items[0].clone())
}

#[async_trait]
impl EventSource for SampleEventSource {
    async fn poll(&self, now: DateTime<Utc>) -> Result<Vec<ScanEvent>> {
        Ok(self.next_scan(now).into_iter().collect())
    }
}
