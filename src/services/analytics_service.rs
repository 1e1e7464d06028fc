//! Analytics service
//!
//! Owns the persisted scan-event log and exposes the aggregator's summaries
//! over it. Recording a scan appends to the bounded log and writes it back.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analytics::{
    AnalyticsFilter, DeviceInfo, EntityPerformance, EventAggregator, EventLog, Location,
    LocationAnalytics, RealtimeStats, SampleEventSource, ScanAnalytics, ScanEvent, user_agent,
};
use crate::config::AnalyticsConfig;
use crate::errors::Result;
use crate::storage::{BeanCatalog, KeyValueStore, StoreKey, load_json, save_json};
use crate::system::Clock;
use crate::utils::generate_random_code;

/// Optional metadata of a recorded scan
#[derive(Debug, Clone, Default)]
pub struct ScanMetadata {
    pub location: Option<Location>,
    /// Takes precedence over what the user agent implies
    pub device: Option<DeviceInfo>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    /// Generated when absent
    pub session_id: Option<String>,
}

pub struct AnalyticsService {
    store: Arc<dyn KeyValueStore>,
    log: RwLock<EventLog>,
    aggregator: EventAggregator,
    clock: Arc<dyn Clock>,
}

impl AnalyticsService {
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        config: &AnalyticsConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let events = load_json::<Vec<ScanEvent>>(store.as_ref(), StoreKey::EventLog)
            .await?
            .unwrap_or_default();
        let log = EventLog::from_events(events, config.event_capacity);
        debug!(
            "AnalyticsService: loaded {} events (capacity {})",
            log.len(),
            log.capacity()
        );

        Ok(Self {
            store,
            log: RwLock::new(log),
            aggregator: EventAggregator::from_config(config, clock.clone()),
            clock,
        })
    }

    async fn persist(&self) -> Result<()> {
        let snapshot = self.log.read().events().to_vec();
        save_json(self.store.as_ref(), StoreKey::EventLog, &snapshot).await
    }

    /// Record one chip read at the current time
    pub async fn record_scan(
        &self,
        chip_id: &str,
        entity_id: &str,
        metadata: ScanMetadata,
    ) -> Result<ScanEvent> {
        info!(
            "AnalyticsService: record_scan chip={} entity={}",
            chip_id, entity_id
        );
        let now = self.clock.now();

        let device = metadata
            .device
            .or_else(|| metadata.user_agent.as_deref().map(user_agent::classify));

        let event = ScanEvent {
            id: format!("scan-{}-{}", now.timestamp_millis(), generate_random_code(6)),
            chip_id: chip_id.to_string(),
            entity_id: entity_id.to_string(),
            timestamp: now,
            location: metadata.location,
            device,
            user_agent: metadata.user_agent,
            referrer: metadata.referrer,
            session_id: metadata
                .session_id
                .unwrap_or_else(|| format!("session-{}", Uuid::new_v4())),
        };

        let evicted = self.log.write().push(event.clone());
        if evicted > 0 {
            debug!("AnalyticsService: evicted {} old events", evicted);
        }
        self.persist().await?;
        Ok(event)
    }

    /// Append externally produced events; returns how many were accepted
    pub async fn ingest(&self, events: Vec<ScanEvent>) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }
        let count = events.len();
        let evicted = self.log.write().extend(events);
        debug!(
            "AnalyticsService: ingested {} events, evicted {}",
            count, evicted
        );
        self.persist().await?;
        Ok(count)
    }

    /// Fill an empty log with sample traffic; a non-empty log is left alone
    pub async fn seed_samples(&self, source: &SampleEventSource, count: usize) -> Result<usize> {
        if !self.log.read().is_empty() {
            warn!("AnalyticsService: log already has events, skipping sample seed");
            return Ok(0);
        }
        let events = source.backfill(count, self.clock.now());
        self.ingest(events).await
    }

    pub fn events(&self) -> Vec<ScanEvent> {
        self.log.read().events().to_vec()
    }

    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }

    pub fn aggregator(&self) -> &EventAggregator {
        &self.aggregator
    }

    // ============ Summaries ============

    pub fn summary(&self, catalog: &BeanCatalog, filter: Option<&AnalyticsFilter>) -> ScanAnalytics {
        info!("AnalyticsService: summary filter={:?}", filter);
        let log = self.log.read();
        self.aggregator.summarize(log.events(), catalog, filter)
    }

    pub fn entity_performance(
        &self,
        catalog: &BeanCatalog,
        entity_id: Option<&str>,
    ) -> Vec<EntityPerformance> {
        info!("AnalyticsService: entity_performance entity={:?}", entity_id);
        let log = self.log.read();
        self.aggregator
            .rank_entity_performance(log.events(), catalog, entity_id)
    }

    pub fn location_analytics(&self, catalog: &BeanCatalog) -> Vec<LocationAnalytics> {
        let log = self.log.read();
        self.aggregator.rank_locations(log.events(), catalog)
    }

    pub fn realtime_stats(&self, catalog: &BeanCatalog) -> RealtimeStats {
        let log = self.log.read();
        self.aggregator
            .realtime_snapshot(log.events(), catalog, self.clock.now())
    }
}
