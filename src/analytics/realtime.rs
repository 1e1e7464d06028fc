//! Periodic realtime snapshot publisher
//!
//! Each tick polls the event source, ingests what arrived and publishes a
//! fresh [`RealtimeStats`] on a watch channel. Subscribers only ever see the
//! latest snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::{EventSource, RealtimeStats};
use crate::errors::Result;
use crate::services::{AnalyticsService, CatalogService};

pub struct RealtimeFeed {
    analytics: Arc<AnalyticsService>,
    catalog: Arc<CatalogService>,
    source: Arc<dyn EventSource>,
    period: Duration,
}

impl RealtimeFeed {
    pub fn new(
        analytics: Arc<AnalyticsService>,
        catalog: Arc<CatalogService>,
        source: Arc<dyn EventSource>,
        period: Duration,
    ) -> Self {
        Self {
            analytics,
            catalog,
            source,
            period,
        }
    }

    /// Current snapshot without polling the source
    pub fn snapshot(&self) -> RealtimeStats {
        self.analytics.realtime_stats(&self.catalog.catalog())
    }

    /// Poll once, ingest, and return the new snapshot
    pub async fn tick(&self) -> Result<RealtimeStats> {
        let now = self.analytics.aggregator().now();
        let events = self.source.poll(now).await?;
        if !events.is_empty() {
            let accepted = self.analytics.ingest(events).await?;
            debug!("RealtimeFeed: ingested {} new events", accepted);
        }
        Ok(self.snapshot())
    }

    /// Run the polling loop in the background
    ///
    /// The loop stops once every receiver has been dropped. A failed tick is
    /// logged and the previous snapshot stays published.
    pub fn spawn(self) -> (watch::Receiver<RealtimeStats>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(self.snapshot());
        info!(
            "RealtimeFeed: started, refreshing every {}s",
            self.period.as_secs_f64()
        );

        let handle = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // first tick completes immediately; the initial snapshot is already published
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match self.tick().await {
                    Ok(stats) => {
                        if tx.send(stats).is_err() {
                            debug!("RealtimeFeed: no subscribers left, stopping");
                            break;
                        }
                    }
                    Err(e) => warn!("RealtimeFeed: tick failed: {}", e),
                }
            }
        });

        (rx, handle)
    }
}
