//! Per-stream statistics

use std::sync::atomic::{AtomicU64, Ordering};

use super::event::EventType;

/// Live counters updated by the publisher task
#[derive(Debug, Default)]
pub(crate) struct PublisherCounters {
    metadata_events: AtomicU64,
    heartbeat_events: AtomicU64,
    monitored_events: AtomicU64,
    polled_events: AtomicU64,
    samples_delivered: AtomicU64,
}

impl PublisherCounters {
    pub fn record(&self, event_type: EventType, samples: usize) {
        let counter = match event_type {
            EventType::Metadata => &self.metadata_events,
            EventType::Heartbeat => &self.heartbeat_events,
            EventType::MonitoredValues => &self.monitored_events,
            EventType::PolledValues => &self.polled_events,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.samples_delivered
            .fetch_add(samples as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PublisherStats {
        PublisherStats {
            metadata_events: self.metadata_events.load(Ordering::Relaxed),
            heartbeat_events: self.heartbeat_events.load(Ordering::Relaxed),
            monitored_events: self.monitored_events.load(Ordering::Relaxed),
            polled_events: self.polled_events.load(Ordering::Relaxed),
            samples_delivered: self.samples_delivered.load(Ordering::Relaxed),
        }
    }
}

/// Statistics snapshot for one stream
#[derive(Debug, Clone, Default)]
pub struct PublisherStats {
    /// Metadata events emitted
    pub metadata_events: u64,
    /// Heartbeat events emitted
    pub heartbeat_events: u64,
    /// Monitored-delta events emitted
    pub monitored_events: u64,
    /// Polled-delta events emitted
    pub polled_events: u64,
    /// Total samples carried across all value events
    pub samples_delivered: u64,
}

impl PublisherStats {
    /// Total events emitted on this stream
    pub fn total_events(&self) -> u64 {
        self.metadata_events + self.heartbeat_events + self.monitored_events + self.polled_events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let counters = PublisherCounters::default();

        counters.record(EventType::Metadata, 0);
        counters.record(EventType::MonitoredValues, 3);
        counters.record(EventType::MonitoredValues, 2);
        counters.record(EventType::Heartbeat, 0);

        let stats = counters.snapshot();
        assert_eq!(stats.metadata_events, 1);
        assert_eq!(stats.monitored_events, 2);
        assert_eq!(stats.heartbeat_events, 1);
        assert_eq!(stats.samples_delivered, 5);
        assert_eq!(stats.total_events(), 4);
    }
}
