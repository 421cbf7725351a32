//! Subscription multiplexer implementation
//!
//! Reference-counts interest per physical channel so that any number of
//! client streams share exactly one upstream acquisition, and fans every
//! received update into the buffers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::adapter::{ChannelUpdate, ControlSystemAdapter};
use crate::buffer::{ChannelValueBuffer, MetadataBuffer};
use crate::config::GatewayConfig;
use crate::sample::ChannelSample;
use crate::stream::descriptor::ChannelSpec;

use super::interest::ChannelInterest;

/// Shares upstream channel acquisitions between client streams
///
/// Interest mutation plus the subscribe/unsubscribe decision is a single
/// atomic unit per channel: each channel entry carries its own mutex, held
/// across the decision.
pub struct SubscriptionMultiplexer {
    adapter: Arc<dyn ControlSystemAdapter>,
    values: Arc<ChannelValueBuffer>,

    /// Map of channel name to its interest entry
    channels: RwLock<HashMap<String, Arc<Mutex<ChannelInterest>>>>,

    /// Sink handed to the adapter; the pump drains it into the buffers
    update_tx: mpsc::Sender<ChannelUpdate>,
    pump: JoinHandle<()>,

    teardown_grace: Duration,
    poll_timeout: Duration,
}

impl SubscriptionMultiplexer {
    /// Create a multiplexer and start its update pump
    pub fn new(
        adapter: Arc<dyn ControlSystemAdapter>,
        values: Arc<ChannelValueBuffer>,
        metadata: Arc<MetadataBuffer>,
        config: &GatewayConfig,
    ) -> Self {
        let (update_tx, update_rx) = mpsc::channel(config.update_queue_capacity);
        let pump = Self::spawn_pump(update_rx, Arc::clone(&values), metadata);

        Self {
            adapter,
            values,
            channels: RwLock::new(HashMap::new()),
            update_tx,
            pump,
            teardown_grace: config.teardown_grace,
            poll_timeout: config.poll_timeout,
        }
    }

    /// Raise interest in a set of channels
    ///
    /// A 0 -> 1 transition establishes exactly one upstream acquisition
    /// for the channel; a pending grace teardown is cancelled instead.
    pub async fn start_monitoring(&self, specs: &[ChannelSpec]) {
        for spec in specs {
            let entry = self.entry_or_create(spec).await;
            let mut guard = entry.lock().await;

            guard.count += 1;
            if guard.cancel_teardown() {
                tracing::debug!(
                    channel = %spec.name,
                    "Pending teardown cancelled by resubscribe"
                );
            }

            if guard.count == 1 && !guard.is_live() {
                // This riser fixes the acquisition shape
                guard.mode = spec.mode;
                guard.poll_interval = spec.poll_interval();
                self.establish(&spec.name, &mut guard).await;
            } else if guard.mode != spec.mode {
                tracing::debug!(
                    channel = %spec.name,
                    requested = ?spec.mode,
                    live = ?guard.mode,
                    "Acquisition shape already fixed by an earlier stream"
                );
            }
        }
    }

    /// Drop interest in a set of channels
    ///
    /// A 1 -> 0 transition schedules physical teardown after the grace
    /// delay; interest rising again first cancels it.
    pub async fn stop_monitoring(&self, channels: &[String]) {
        for name in channels {
            let entry = {
                let map = self.channels.read().await;
                map.get(name).cloned()
            };
            let Some(entry) = entry else {
                tracing::warn!(channel = %name, "Stop for a channel never started");
                continue;
            };

            let mut guard = entry.lock().await;
            if guard.count == 0 {
                tracing::warn!(channel = %name, "Interest already zero");
                continue;
            }
            guard.count -= 1;

            if guard.count == 0 {
                let timer = self.schedule_teardown(name.clone(), Arc::clone(&entry));
                guard.pending_teardown = Some(timer);
                tracing::debug!(
                    channel = %name,
                    grace_ms = self.teardown_grace.as_millis() as u64,
                    "Interest reached zero, teardown scheduled"
                );
            }
        }
    }

    /// Current interest count for a channel
    pub async fn interest_count(&self, channel: &str) -> u32 {
        let entry = {
            let map = self.channels.read().await;
            map.get(channel).cloned()
        };
        match entry {
            Some(entry) => entry.lock().await.count,
            None => 0,
        }
    }

    async fn entry_or_create(&self, spec: &ChannelSpec) -> Arc<Mutex<ChannelInterest>> {
        {
            let map = self.channels.read().await;
            if let Some(entry) = map.get(&spec.name) {
                return entry.clone();
            }
        }

        let mut map = self.channels.write().await;
        map.entry(spec.name.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(ChannelInterest::new(
                    spec.mode,
                    spec.poll_interval(),
                )))
            })
            .clone()
    }

    /// Bring the upstream acquisition up for a channel
    ///
    /// Failures are written to the buffer as a disconnected sample and
    /// never escape; this subsystem does not retry the adapter.
    async fn establish(&self, channel: &str, guard: &mut ChannelInterest) {
        if guard.mode.uses_push() {
            match self.adapter.subscribe(channel, self.update_tx.clone()).await {
                Ok(handle) => {
                    guard.monitor = Some(handle);
                    tracing::info!(channel = %channel, "Upstream subscription established");
                }
                Err(e) => {
                    tracing::warn!(channel = %channel, error = %e, "Upstream subscribe failed");
                    self.values.save(channel, ChannelSample::disconnected()).await;
                }
            }
        }

        if guard.mode.uses_poll_timer() {
            guard.poller = Some(self.spawn_poller(channel, guard.poll_interval));
            tracing::info!(
                channel = %channel,
                interval_ms = guard.poll_interval.as_millis() as u64,
                "Upstream poll timer started"
            );
        }
    }

    fn spawn_poller(&self, channel: &str, interval: Duration) -> JoinHandle<()> {
        let adapter = Arc::clone(&self.adapter);
        let values = Arc::clone(&self.values);
        let poll_timeout = self.poll_timeout;
        let name = channel.to_string();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let sample =
                    match tokio::time::timeout(poll_timeout, adapter.poll_once(&name)).await {
                        Ok(Ok(sample)) => sample,
                        Ok(Err(e)) => {
                            tracing::debug!(channel = %name, error = %e, "Poll failed");
                            ChannelSample::disconnected()
                        }
                        Err(_) => {
                            tracing::debug!(channel = %name, "Poll timed out");
                            ChannelSample::disconnected()
                        }
                    };
                values.save(&name, sample).await;
            }
        })
    }

    fn schedule_teardown(
        &self,
        channel: String,
        entry: Arc<Mutex<ChannelInterest>>,
    ) -> JoinHandle<()> {
        let adapter = Arc::clone(&self.adapter);
        let grace = self.teardown_grace;

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            let handle = {
                let mut guard = entry.lock().await;
                if guard.count > 0 {
                    // Interest came back while this timer was waiting for
                    // the entry lock
                    guard.pending_teardown = None;
                    return;
                }
                guard.take_live()
            };

            if let Some(handle) = handle {
                adapter.unsubscribe(handle).await;
            }
            tracing::info!(channel = %channel, "Channel torn down after grace period");
        })
    }

    fn spawn_pump(
        mut update_rx: mpsc::Receiver<ChannelUpdate>,
        values: Arc<ChannelValueBuffer>,
        metadata: Arc<MetadataBuffer>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(update) = update_rx.recv().await {
                match update {
                    ChannelUpdate::Value { channel, sample } => {
                        values.save(&channel, sample).await;
                    }
                    ChannelUpdate::Metadata { channel, metadata: meta } => {
                        metadata.save(&channel, meta).await;
                    }
                }
            }
        })
    }
}

impl Drop for SubscriptionMultiplexer {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
