use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DeviceType, ScanEvent};

/// Inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// `start > end`; such a range matches nothing
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// Per-query restriction of the event set
///
/// An empty allow-list places no restriction. `locations` entries match either
/// the country alone or the `country-city` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsFilter {
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default, alias = "beanIds")]
    pub entity_ids: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub device_types: Vec<DeviceType>,
}

impl AnalyticsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    pub fn with_entities<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_device_types(mut self, types: impl IntoIterator<Item = DeviceType>) -> Self {
        self.device_types = types.into_iter().collect();
        self
    }

    pub fn matches(&self, event: &ScanEvent) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(event.timestamp) {
                return false;
            }
        }

        if !self.entity_ids.is_empty() && !self.entity_ids.iter().any(|id| *id == event.entity_id)
        {
            return false;
        }

        if !self.locations.is_empty() {
            let Some(location) = &event.location else {
                return false;
            };
            let key = location.key();
            if !self
                .locations
                .iter()
                .any(|l| *l == location.country || *l == key)
            {
                return false;
            }
        }

        if !self.device_types.is_empty() {
            match event.device_type() {
                Some(t) if self.device_types.contains(&t) => {}
                _ => return false,
            }
        }

        true
    }

    /// Events that pass the filter, in input order
    pub fn apply<'a>(&self, events: &'a [ScanEvent]) -> Vec<&'a ScanEvent> {
        if self.date_range.is_some_and(|r| r.is_inverted()) {
            return Vec::new();
        }
        events.iter().filter(|e| self.matches(e)).collect()
    }
}
