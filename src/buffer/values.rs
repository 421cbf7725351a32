//! Bounded per-channel sample store
//!
//! Samples are appended in receipt order and evicted oldest-first once a
//! channel exceeds the configured capacity. The map is two-level: a short
//! read-lock resolves the channel slot, then the slot's own lock covers the
//! sample list, so one channel's write never blocks another channel's read.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::error::{GatewayError, Result};
use crate::sample::ChannelSample;

type Slot = Arc<RwLock<VecDeque<ChannelSample>>>;

/// Time-ordered bounded buffer of samples, one list per channel
pub struct ChannelValueBuffer {
    /// Maximum samples retained per channel
    capacity: usize,

    /// Map of channel name to its sample slot
    channels: RwLock<HashMap<String, Slot>>,
}

impl ChannelValueBuffer {
    /// Create a buffer retaining at most `capacity` samples per channel
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Append a sample; evicts the oldest if the channel is at capacity
    pub async fn save(&self, channel: &str, sample: ChannelSample) {
        let slot = self.slot_or_create(channel).await;
        let mut samples = slot.write().await;

        samples.push_back(sample);
        while samples.len() > self.capacity {
            samples.pop_front();
        }
    }

    /// Most recent sample of a channel
    ///
    /// Fails with `UnknownChannel` if the channel was never written.
    pub async fn latest(&self, channel: &str) -> Result<ChannelSample> {
        let slot = {
            let channels = self.channels.read().await;
            channels.get(channel).cloned()
        };

        let slot = slot.ok_or_else(|| GatewayError::UnknownChannel(channel.to_string()))?;
        let samples = slot.read().await;
        samples
            .back()
            .cloned()
            .ok_or_else(|| GatewayError::UnknownChannel(channel.to_string()))
    }

    /// Samples received strictly later than `since`, per channel
    ///
    /// Channels with no qualifying sample are omitted from the result,
    /// never mapped to an empty list.
    pub async fn later_than(
        &self,
        channels: &[String],
        since: Instant,
    ) -> HashMap<String, Vec<ChannelSample>> {
        let slots: Vec<(String, Slot)> = {
            let map = self.channels.read().await;
            channels
                .iter()
                .filter_map(|name| map.get(name).map(|slot| (name.clone(), slot.clone())))
                .collect()
        };

        let mut result = HashMap::new();
        for (name, slot) in slots {
            let samples = slot.read().await;
            let fresh: Vec<ChannelSample> = samples
                .iter()
                .filter(|s| s.received_at > since)
                .cloned()
                .collect();
            if !fresh.is_empty() {
                result.insert(name, fresh);
            }
        }
        result
    }

    /// Number of samples currently buffered for a channel
    pub async fn len(&self, channel: &str) -> usize {
        let slot = {
            let channels = self.channels.read().await;
            channels.get(channel).cloned()
        };
        match slot {
            Some(slot) => slot.read().await.len(),
            None => 0,
        }
    }

    /// Number of channels that have been written at least once
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    async fn slot_or_create(&self, channel: &str) -> Slot {
        {
            let channels = self.channels.read().await;
            if let Some(slot) = channels.get(channel) {
                return slot.clone();
            }
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(channel.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(VecDeque::new())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::sample::SampleValue;

    use super::*;

    fn sample(v: i64) -> ChannelSample {
        ChannelSample::connected(SampleValue::Long(v), v as u64)
    }

    fn sample_at(v: i64, base: Instant, offset_ms: u64) -> ChannelSample {
        let mut s = sample(v);
        s.received_at = base + Duration::from_millis(offset_ms);
        s
    }

    #[tokio::test]
    async fn test_eviction_keeps_most_recent() {
        let buffer = ChannelValueBuffer::new(3);
        let base = Instant::now();

        // capacity + k pushes leave exactly the most recent capacity
        for v in 0..7 {
            buffer.save("ch", sample_at(v, base, (v + 1) as u64)).await;
        }

        assert_eq!(buffer.len("ch").await, 3);
        let all = buffer.later_than(&["ch".to_string()], base).await;
        let values: Vec<i64> = all["ch"].iter().map(|s| s.source_ts_ms as i64).collect();
        assert_eq!(values, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn test_latest_unknown_channel() {
        let buffer = ChannelValueBuffer::new(4);

        let err = buffer.latest("never-written").await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownChannel(_)));
    }

    #[tokio::test]
    async fn test_latest_returns_newest() {
        let buffer = ChannelValueBuffer::new(4);

        buffer.save("ch", sample(1)).await;
        buffer.save("ch", sample(2)).await;

        let latest = buffer.latest("ch").await.unwrap();
        assert_eq!(latest.source_ts_ms, 2);
    }

    #[tokio::test]
    async fn test_later_than_is_strict_and_omits_empty() {
        let buffer = ChannelValueBuffer::new(8);
        let base = Instant::now();

        buffer.save("a", sample_at(1, base, 100)).await;
        buffer.save("a", sample_at(2, base, 200)).await;
        buffer.save("b", sample_at(3, base, 50)).await;

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let result = buffer.later_than(&keys, base + Duration::from_millis(100)).await;

        // "a": only the sample strictly after 100ms; "b": nothing
        // qualifying; "c": never written. Neither b nor c may appear.
        assert_eq!(result.len(), 1);
        assert_eq!(result["a"].len(), 1);
        assert_eq!(result["a"][0].source_ts_ms, 2);
    }

    #[tokio::test]
    async fn test_later_than_preserves_order() {
        let buffer = ChannelValueBuffer::new(8);
        let base = Instant::now();

        for (v, off) in [(1, 10), (2, 20), (3, 30)] {
            buffer.save("ch", sample_at(v, base, off)).await;
        }

        let result = buffer.later_than(&["ch".to_string()], base).await;
        let values: Vec<u64> = result["ch"].iter().map(|s| s.source_ts_ms).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_channel_isolation() {
        // A held write guard on one channel must not block another
        // channel's read
        tokio_test::block_on(async {
            let buffer = ChannelValueBuffer::new(4);
            buffer.save("a", sample(1)).await;
            buffer.save("b", sample(2)).await;

            let slot_a = {
                let channels = buffer.channels.read().await;
                channels.get("a").cloned().unwrap()
            };
            let _held = slot_a.write().await;

            // Reading channel b completes while a's slot is locked
            let latest_b = buffer.latest("b").await.unwrap();
            assert_eq!(latest_b.source_ts_ms, 2);
        });
    }
}
