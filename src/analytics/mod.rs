//! Scan-event analytics
//!
//! - [`ScanEvent`] and its location/device metadata
//! - [`EventLog`]: bounded FIFO of recorded events
//! - [`AnalyticsFilter`]: per-query allow-lists and date range
//! - [`EventAggregator`]: the summaries behind the dashboards
//! - [`EventSource`]: where new events come from (sample generator for demos)
//! - [`RealtimeFeed`]: periodic snapshot publisher

pub mod aggregator;
pub mod event_log;
pub mod filter;
pub mod realtime;
pub mod source;
pub mod user_agent;

pub use aggregator::{
    DayCount, DeviceStats, EntityPerformance, EventAggregator, HourCount, LocationAnalytics,
    LocationEntityCount, RealtimeStats, ScanAnalytics, TopEntity, TopLocation, Trend,
};
pub use event_log::EventLog;
pub use filter::{AnalyticsFilter, DateRange};
pub use realtime::RealtimeFeed;
pub use source::{EventSource, SampleEventSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

/// Device category of the phone or browser that read the chip
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Desktop,
    Tablet,
    /// Anything else; counted in no device bucket
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::str::FromStr for DeviceType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mobile" => Ok(Self::Mobile),
            "desktop" => Ok(Self::Desktop),
            "tablet" => Ok(Self::Tablet),
            _ => Err(format!(
                "Invalid device type: '{}'. Valid: mobile, desktop, tablet",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Location {
    pub fn new(country: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            city: city.into(),
            coordinates: None,
        }
    }

    /// Composite `country-city` key
    pub fn key(&self) -> String {
        format!("{}-{}", self.country, self.city)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub browser: String,
}

/// One NFC chip read
///
/// Immutable once recorded. `entityId` is also accepted as `beanId` when
/// reading stored logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    pub id: String,
    #[serde(default)]
    pub chip_id: String,
    #[serde(alias = "beanId")]
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default)]
    pub session_id: String,
}

impl ScanEvent {
    pub fn device_type(&self) -> Option<DeviceType> {
        self.device.as_ref().map(|d| d.device_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accepts_bean_id_alias() {
        let json = r#"{
            "id": "scan-1",
            "chipId": "NFC-1",
            "beanId": "bean-1",
            "timestamp": "2024-10-01T09:30:00Z",
            "device": {"type": "watch", "os": "watchOS", "browser": "Safari"},
            "sessionId": "session-1"
        }"#;
        let event: ScanEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.entity_id, "bean-1");
        assert_eq!(event.device_type(), Some(DeviceType::Unknown));
        assert!(event.location.is_none());

        let out = serde_json::to_value(&event).unwrap();
        assert_eq!(out["entityId"], "bean-1");
    }

    #[test]
    fn test_device_type_from_str() {
        assert_eq!("Mobile".parse::<DeviceType>(), Ok(DeviceType::Mobile));
        assert!("watch".parse::<DeviceType>().is_err());
    }
}
