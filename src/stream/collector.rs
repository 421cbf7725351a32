//! Per-stream delta collection
//!
//! The collector reads the shared buffers for one stream's channel set and
//! pushes everything through the channels' configured samplers. It owns the
//! sampler instances: one per channel per delivery category, so a
//! poll-and-monitor channel never shares filter state between categories.
//!
//! The publisher task is the single sequential caller, which is what lets
//! the samplers stay lock-free.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::buffer::{ChannelValueBuffer, MetadataBuffer};
use crate::filter::{build_sampler, ValueSampler};
use crate::sample::{ChannelMetadata, ChannelSample};

use super::descriptor::{AcquisitionMode, StreamDescriptor};

/// Buffer reader + sampler driver for one stream
pub struct StreamCollector {
    values: Arc<ChannelValueBuffer>,
    metadata: Arc<MetadataBuffer>,
    descriptor: StreamDescriptor,

    monitored_samplers: HashMap<String, Box<dyn ValueSampler>>,
    polled_samplers: HashMap<String, Box<dyn ValueSampler>>,

    /// Receipt instant of the newest sample already fed to each channel's
    /// sampler. Guards the samplers against consuming a sample twice when
    /// a tick window overlaps a concurrent buffer write.
    cursors: HashMap<String, Instant>,
}

impl StreamCollector {
    pub fn new(
        values: Arc<ChannelValueBuffer>,
        metadata: Arc<MetadataBuffer>,
        descriptor: StreamDescriptor,
    ) -> Self {
        let monitored_samplers = descriptor
            .monitored_channels()
            .iter()
            .map(|c| (c.name.clone(), build_sampler(&c.filter)))
            .collect();
        let polled_samplers = descriptor
            .polled_channels()
            .iter()
            .map(|c| (c.name.clone(), build_sampler(&c.filter)))
            .collect();

        Self {
            values,
            metadata,
            descriptor,
            monitored_samplers,
            polled_samplers,
            cursors: HashMap::new(),
        }
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    /// Monitored-channel changes since `since`, filtered per channel
    ///
    /// Channels whose filtered result is empty are dropped from the map.
    pub async fn monitored_delta(
        &mut self,
        since: Instant,
    ) -> HashMap<String, Vec<ChannelSample>> {
        let names: Vec<String> = self
            .descriptor
            .monitored_channels()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        let mut fresh = self.values.later_than(&names, since).await;

        let mut delta = HashMap::new();
        for name in names {
            let input = self.advance_cursor(&name, fresh.remove(&name).unwrap_or_default());
            let Some(sampler) = self.monitored_samplers.get_mut(&name) else {
                continue;
            };
            let survivors = sampler.apply(input);
            if !survivors.is_empty() {
                delta.insert(name, survivors);
            }
        }
        delta
    }

    /// Polled-channel changes since `since`, filtered per channel
    ///
    /// Poll-monitor channels sample the cached latest value on every tick
    /// instead of a change window; a channel with nothing buffered yet
    /// contributes a disconnected placeholder there.
    pub async fn polled_delta(&mut self, since: Instant) -> HashMap<String, Vec<ChannelSample>> {
        let window_names: Vec<String> = self
            .descriptor
            .polled_channels()
            .iter()
            .filter(|c| c.mode != AcquisitionMode::PollMonitor)
            .map(|c| c.name.clone())
            .collect();
        let mut fresh = self.values.later_than(&window_names, since).await;

        let specs: Vec<(String, AcquisitionMode)> = self
            .descriptor
            .polled_channels()
            .iter()
            .map(|c| (c.name.clone(), c.mode))
            .collect();

        let mut delta = HashMap::new();
        for (name, mode) in specs {
            let input = if mode == AcquisitionMode::PollMonitor {
                vec![self.latest_or_placeholder(&name).await]
            } else {
                self.advance_cursor(&name, fresh.remove(&name).unwrap_or_default())
            };

            let Some(sampler) = self.polled_samplers.get_mut(&name) else {
                continue;
            };
            let survivors = sampler.apply(input);
            if !survivors.is_empty() {
                delta.insert(name, survivors);
            }
        }
        delta
    }

    /// Latest value per channel, with disconnected placeholders for
    /// channels that have no buffered data yet
    pub async fn snapshot(&self) -> HashMap<String, ChannelSample> {
        let mut snapshot = HashMap::new();
        for name in self.descriptor.channel_names() {
            let sample = self.latest_or_placeholder(&name).await;
            snapshot.insert(name, sample);
        }
        snapshot
    }

    /// Metadata per channel, with unknown-type placeholders for channels
    /// the source has not described yet
    pub async fn metadata(&self) -> HashMap<String, ChannelMetadata> {
        let names = self.descriptor.channel_names();
        let mut known = self.metadata.get(&names).await;

        let mut result = HashMap::new();
        for name in names {
            let meta = known.remove(&name).unwrap_or_else(ChannelMetadata::unknown);
            result.insert(name, meta);
        }
        result
    }

    async fn latest_or_placeholder(&self, channel: &str) -> ChannelSample {
        self.values
            .latest(channel)
            .await
            .unwrap_or_else(|_| ChannelSample::disconnected())
    }

    /// Drop samples the sampler has already consumed and remember the
    /// newest receipt instant of the rest
    fn advance_cursor(
        &mut self,
        channel: &str,
        input: Vec<ChannelSample>,
    ) -> Vec<ChannelSample> {
        let cursor = self.cursors.get(channel).copied();
        let fresh: Vec<ChannelSample> = match cursor {
            Some(cursor) => input
                .into_iter()
                .filter(|s| s.received_at > cursor)
                .collect(),
            None => input,
        };

        if let Some(newest) = fresh.iter().map(|s| s.received_at).max() {
            self.cursors.insert(channel.to_string(), newest);
        }
        fresh
    }
}
