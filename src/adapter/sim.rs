//! Simulated control system
//!
//! A deterministic in-process source for tests and demos: each registered
//! channel produces a linear ramp, monitors emit at a fixed period, and
//! polls return the next ramp value immediately. Per-channel call counters
//! expose how often the gateway actually reached upstream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::sample::{epoch_millis, ChannelMetadata, ChannelSample, SampleValue};

use super::{AdapterError, ChannelUpdate, ControlSystemAdapter, SubscriptionHandle, UpdateSink};

/// Behavior of one simulated channel
#[derive(Debug, Clone)]
pub struct SimChannelSpec {
    /// Emission period for push subscriptions
    pub period: Duration,

    /// Ramp start value
    pub offset: f64,

    /// Ramp increment per emitted value
    pub step: f64,

    /// Engineering units reported in metadata
    pub units: String,

    /// Fail every subscribe and poll for this channel
    pub failing: bool,
}

impl Default for SimChannelSpec {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(50),
            offset: 0.0,
            step: 1.0,
            units: "counts".into(),
            failing: false,
        }
    }
}

impl SimChannelSpec {
    /// Set the push emission period
    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Mark the channel as permanently failing
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[derive(Debug, Default)]
struct ChannelCounters {
    subscribes: u64,
    unsubscribes: u64,
    polls: u64,
}

struct SimChannel {
    spec: SimChannelSpec,
    counters: ChannelCounters,
    /// Ramp position shared between polls and monitors
    tick: Arc<AtomicU64>,
}

/// Deterministic simulated adapter
pub struct SimAdapter {
    channels: Mutex<HashMap<String, SimChannel>>,
    subscriptions: Mutex<HashMap<u64, (String, JoinHandle<()>)>>,
    next_handle: AtomicU64,
}

impl SimAdapter {
    /// Create an adapter with no channels registered
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Register a channel
    pub async fn add_channel(&self, name: impl Into<String>, spec: SimChannelSpec) {
        let mut channels = self.channels.lock().await;
        channels.insert(
            name.into(),
            SimChannel {
                spec,
                counters: ChannelCounters::default(),
                tick: Arc::new(AtomicU64::new(0)),
            },
        );
    }

    /// How often the gateway subscribed to a channel
    pub async fn subscribe_count(&self, channel: &str) -> u64 {
        self.counter(channel, |c| c.subscribes).await
    }

    /// How often the gateway unsubscribed from a channel
    pub async fn unsubscribe_count(&self, channel: &str) -> u64 {
        self.counter(channel, |c| c.unsubscribes).await
    }

    /// How often the gateway polled a channel
    pub async fn poll_count(&self, channel: &str) -> u64 {
        self.counter(channel, |c| c.polls).await
    }

    /// Number of currently live push subscriptions
    pub async fn active_subscriptions(&self) -> usize {
        self.subscriptions.lock().await.len()
    }

    async fn counter(&self, channel: &str, read: impl Fn(&ChannelCounters) -> u64) -> u64 {
        let channels = self.channels.lock().await;
        channels.get(channel).map(|ch| read(&ch.counters)).unwrap_or(0)
    }

    fn ramp_sample(spec: &SimChannelSpec, tick: u64) -> ChannelSample {
        let value = spec.offset + spec.step * tick as f64;
        ChannelSample::connected(SampleValue::Double(value), epoch_millis())
    }

    fn metadata_for(spec: &SimChannelSpec) -> ChannelMetadata {
        ChannelMetadata::of_type("DOUBLE").units(spec.units.clone())
    }
}

impl Default for SimAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlSystemAdapter for SimAdapter {
    async fn subscribe(
        &self,
        channel: &str,
        updates: UpdateSink,
    ) -> std::result::Result<SubscriptionHandle, AdapterError> {
        let (spec, tick) = {
            let mut channels = self.channels.lock().await;
            let entry = channels
                .get_mut(channel)
                .ok_or_else(|| AdapterError::new(channel, "unknown channel"))?;
            entry.counters.subscribes += 1;
            if entry.spec.failing {
                return Err(AdapterError::new(channel, "simulated connection failure"));
            }
            (entry.spec.clone(), entry.tick.clone())
        };

        // Metadata is announced once, before any value
        let meta_update = ChannelUpdate::Metadata {
            channel: channel.to_string(),
            metadata: Self::metadata_for(&spec),
        };
        if updates.send(meta_update).await.is_err() {
            return Err(AdapterError::new(channel, "update sink closed"));
        }

        let name = channel.to_string();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(spec.period);
            ticker.tick().await; // first tick completes immediately
            loop {
                ticker.tick().await;
                let n = tick.fetch_add(1, Ordering::Relaxed);
                let update = ChannelUpdate::Value {
                    channel: name.clone(),
                    sample: Self::ramp_sample(&spec, n),
                };
                if updates.send(update).await.is_err() {
                    break;
                }
            }
        });

        let handle = SubscriptionHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .lock()
            .await
            .insert(handle.value(), (channel.to_string(), task));
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) {
        let removed = self.subscriptions.lock().await.remove(&handle.value());
        if let Some((channel, task)) = removed {
            task.abort();
            let mut channels = self.channels.lock().await;
            if let Some(entry) = channels.get_mut(&channel) {
                entry.counters.unsubscribes += 1;
            }
        }
    }

    async fn poll_once(
        &self,
        channel: &str,
    ) -> std::result::Result<ChannelSample, AdapterError> {
        let mut channels = self.channels.lock().await;
        let entry = channels
            .get_mut(channel)
            .ok_or_else(|| AdapterError::new(channel, "unknown channel"))?;
        entry.counters.polls += 1;
        if entry.spec.failing {
            return Err(AdapterError::new(channel, "simulated read failure"));
        }
        let n = entry.tick.fetch_add(1, Ordering::Relaxed);
        Ok(Self::ramp_sample(&entry.spec, n))
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn test_poll_ramp_is_deterministic() {
        let adapter = SimAdapter::new();
        adapter
            .add_channel("ch", SimChannelSpec { offset: 10.0, step: 2.0, ..Default::default() })
            .await;

        let a = adapter.poll_once("ch").await.unwrap();
        let b = adapter.poll_once("ch").await.unwrap();

        assert_eq!(a.numeric(), Some(10.0));
        assert_eq!(b.numeric(), Some(12.0));
        assert_eq!(adapter.poll_count("ch").await, 2);
    }

    #[tokio::test]
    async fn test_unknown_channel_fails() {
        let adapter = SimAdapter::new();
        assert!(adapter.poll_once("nope").await.is_err());

        let (tx, _rx) = mpsc::channel(4);
        assert!(adapter.subscribe("nope", tx).await.is_err());
    }

    #[tokio::test]
    async fn test_subscribe_pushes_metadata_then_values() {
        let adapter = SimAdapter::new();
        adapter
            .add_channel(
                "ch",
                SimChannelSpec::default().period(Duration::from_millis(10)),
            )
            .await;

        let (tx, mut rx) = mpsc::channel(16);
        let handle = adapter.subscribe("ch", tx).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ChannelUpdate::Metadata { .. }));

        let second = rx.recv().await.unwrap();
        match second {
            ChannelUpdate::Value { channel, sample } => {
                assert_eq!(channel, "ch");
                assert!(sample.is_connected());
            }
            other => panic!("expected value update, got {:?}", other),
        }

        adapter.unsubscribe(handle).await;
        assert_eq!(adapter.active_subscriptions().await, 0);
        assert_eq!(adapter.unsubscribe_count("ch").await, 1);
    }

    #[tokio::test]
    async fn test_failing_channel() {
        let adapter = SimAdapter::new();
        adapter
            .add_channel("bad", SimChannelSpec::default().failing())
            .await;

        assert!(adapter.poll_once("bad").await.is_err());

        let (tx, _rx) = mpsc::channel(4);
        assert!(adapter.subscribe("bad", tx).await.is_err());
        // The attempt still counts
        assert_eq!(adapter.subscribe_count("bad").await, 1);
    }
}
