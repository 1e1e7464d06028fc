use tracing::trace;

use super::ScanEvent;

/// Default number of events retained
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Bounded, append-only event window
///
/// Past capacity the oldest events are dropped first.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog {
    events: Vec<ScanEvent>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild from stored events, keeping only the newest `capacity`
    pub fn from_events(events: Vec<ScanEvent>, capacity: usize) -> Self {
        let mut log = Self::with_capacity(capacity);
        log.events = events;
        log.evict();
        log
    }

    /// Append one event; returns how many old events were evicted
    pub fn push(&mut self, event: ScanEvent) -> usize {
        self.events.push(event);
        self.evict()
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = ScanEvent>) -> usize {
        self.events.extend(events);
        self.evict()
    }

    fn evict(&mut self) -> usize {
        let overflow = self.events.len().saturating_sub(self.capacity);
        if overflow > 0 {
            self.events.drain(..overflow);
            trace!("EventLog: evicted {} oldest events", overflow);
        }
        overflow
    }

    pub fn events(&self) -> &[ScanEvent] {
        &self.events
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(n: usize) -> ScanEvent {
        ScanEvent {
            id: format!("scan-{}", n),
            chip_id: String::new(),
            entity_id: "bean".to_string(),
            timestamp: Utc::now(),
            location: None,
            device: None,
            user_agent: None,
            referrer: None,
            session_id: format!("s{}", n),
        }
    }

    #[test]
    fn test_fifo_eviction() {
        let mut log = EventLog::with_capacity(3);
        for n in 0..3 {
            assert_eq!(log.push(event(n)), 0);
        }
        assert_eq!(log.push(event(3)), 1);
        let ids: Vec<&str> = log.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["scan-1", "scan-2", "scan-3"]);
    }

    #[test]
    fn test_from_events_trims_to_capacity() {
        let log = EventLog::from_events((0..5).map(event).collect(), 2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0].id, "scan-3");
    }
}
