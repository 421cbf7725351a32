//! Stream publisher
//!
//! One publisher per client stream. Activation emits the metadata event
//! and starts a single owned task driving up to three periodic sources
//! (heartbeat, polled-delta, monitored-delta); every non-empty tick
//! becomes one event on a broadcast output shared by any number of
//! consumers.
//!
//! Lifecycle is strictly Created -> Active -> ShutDown; operations against
//! the wrong state fail loudly so callers and tests can assert on them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::buffer::{ChannelValueBuffer, MetadataBuffer};
use crate::error::{GatewayError, Result};
use crate::ids::StreamId;
use crate::mux::SubscriptionMultiplexer;

use super::collector::StreamCollector;
use super::descriptor::{ChannelSpec, StreamDescriptor, StreamProperties};
use super::event::{EventType, StreamEvent};
use super::stats::{PublisherCounters, PublisherStats};

/// Lifecycle state of a publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    /// Built but not yet started
    Created,
    /// Emitting events
    Active,
    /// Terminal; no transition leaves this state
    ShutDown,
}

/// Periodic composition engine for one client stream
pub struct StreamPublisher {
    id: StreamId,

    /// Channel names, fixed for the stream's lifetime
    channel_names: Vec<String>,

    descriptor: Mutex<StreamDescriptor>,
    state: Mutex<PublisherState>,

    /// Broadcast fan-out to stream consumers
    events_tx: broadcast::Sender<StreamEvent>,

    /// The owned tick task while Active
    task: Mutex<Option<JoinHandle<()>>>,

    mux: Arc<SubscriptionMultiplexer>,
    values: Arc<ChannelValueBuffer>,
    metadata: Arc<MetadataBuffer>,

    counters: Arc<PublisherCounters>,
    started_at: Mutex<Option<Instant>>,
}

impl StreamPublisher {
    /// Build a publisher in the Created state
    pub fn new(
        descriptor: StreamDescriptor,
        mux: Arc<SubscriptionMultiplexer>,
        values: Arc<ChannelValueBuffer>,
        metadata: Arc<MetadataBuffer>,
        event_capacity: usize,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(event_capacity);

        Self {
            id: descriptor.id(),
            channel_names: descriptor.channel_names(),
            descriptor: Mutex::new(descriptor),
            state: Mutex::new(PublisherState::Created),
            events_tx,
            task: Mutex::new(None),
            mux,
            values,
            metadata,
            counters: Arc::new(PublisherCounters::default()),
            started_at: Mutex::new(None),
        }
    }

    /// Stream id
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Current lifecycle state
    pub async fn state(&self) -> PublisherState {
        *self.state.lock().await
    }

    /// Attach a consumer to the output stream
    ///
    /// Permitted while Created (attach before activation to observe the
    /// metadata event) and while Active. Fails after shutdown. A consumer
    /// dropping its receiver detaches only itself.
    pub async fn events(&self) -> Result<broadcast::Receiver<StreamEvent>> {
        let state = self.state.lock().await;
        if *state == PublisherState::ShutDown {
            return Err(self.state_error("output stream requested after shutdown"));
        }
        Ok(self.events_tx.subscribe())
    }

    /// Start the stream: raise channel interest, emit metadata, start ticks
    pub async fn activate(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match *state {
            PublisherState::Created => {}
            PublisherState::Active => return Err(self.state_error("already active")),
            PublisherState::ShutDown => return Err(self.state_error("already shut down")),
        }

        let descriptor = self.descriptor.lock().await.clone();
        self.mux.start_monitoring(descriptor.channels()).await;

        let task = self.spawn_run_task(descriptor, true);
        *self.task.lock().await = Some(task);
        *self.started_at.lock().await = Some(Instant::now());
        *state = PublisherState::Active;

        tracing::info!(
            stream = %self.id,
            channels = self.channel_names.len(),
            "Stream activated"
        );
        Ok(())
    }

    /// Stop the stream and release its channels
    ///
    /// Stops the tick task, drops this stream's interest in every channel
    /// (shared channels stay live for other streams), and enters the
    /// terminal state. A second call fails.
    pub async fn shutdown(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match *state {
            PublisherState::Created => Err(self.state_error("shutdown before activation")),
            PublisherState::ShutDown => Err(self.state_error("already shut down")),
            PublisherState::Active => {
                if let Some(task) = self.task.lock().await.take() {
                    task.abort();
                }
                self.mux.stop_monitoring(&self.channel_names).await;
                *state = PublisherState::ShutDown;

                tracing::info!(stream = %self.id, "Stream shut down");
                Ok(())
            }
        }
    }

    /// Replace channel properties and stream intervals
    ///
    /// Channel membership is immutable; the upstream acquisition shape is
    /// untouched (interest counts do not change). The tick task restarts
    /// with fresh samplers; the metadata event is not re-emitted.
    pub async fn reload(
        &self,
        channels: Vec<ChannelSpec>,
        properties: StreamProperties,
    ) -> Result<()> {
        let state = self.state.lock().await;
        if *state != PublisherState::Active {
            return Err(self.state_error("reload requires an active stream"));
        }

        let reconfigured = {
            let descriptor = self.descriptor.lock().await;
            descriptor.reconfigured(channels, properties)?
        };

        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
        *self.descriptor.lock().await = reconfigured.clone();
        let task = self.spawn_run_task(reconfigured, false);
        *self.task.lock().await = Some(task);

        tracing::info!(stream = %self.id, "Stream properties reloaded");
        Ok(())
    }

    /// Statistics snapshot
    pub fn stats(&self) -> PublisherStats {
        self.counters.snapshot()
    }

    /// Time since activation, if activated
    pub async fn uptime(&self) -> Option<Duration> {
        self.started_at.lock().await.map(|t| t.elapsed())
    }

    fn state_error(&self, message: &str) -> GatewayError {
        GatewayError::PublisherState {
            stream: self.id,
            message: message.into(),
        }
    }

    fn spawn_run_task(&self, descriptor: StreamDescriptor, emit_metadata: bool) -> JoinHandle<()> {
        let collector = StreamCollector::new(
            Arc::clone(&self.values),
            Arc::clone(&self.metadata),
            descriptor,
        );
        let events_tx = self.events_tx.clone();
        let counters = Arc::clone(&self.counters);

        tokio::spawn(run_ticks(collector, events_tx, counters, emit_metadata))
    }
}

/// The per-stream tick loop
///
/// Single task per stream: sampler state is only ever touched here, which
/// is the sequential-caller discipline the filters rely on. Each emitted
/// payload is fully built before the send, so consumers never observe a
/// partial tick.
async fn run_ticks(
    mut collector: StreamCollector,
    events_tx: broadcast::Sender<StreamEvent>,
    counters: Arc<PublisherCounters>,
    emit_metadata: bool,
) {
    let stream_id = collector.descriptor().id();
    let props = collector.descriptor().properties().clone();
    let precision = props.numeric_precision;

    if emit_metadata {
        let delay = props.metadata_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let metadata = collector.metadata().await;
        let event = StreamEvent::metadata(stream_id, &metadata);
        counters.record(EventType::Metadata, 0);
        let _ = events_tx.send(event);
    }

    let has_monitored = collector.descriptor().has_monitored();
    let has_polled = collector.descriptor().has_polled();

    // Value timers are created only after the metadata event went out,
    // which keeps metadata strictly first for any metadata delay. First
    // tick of every source is one full period after this point.
    let epoch = tokio::time::Instant::now();
    let mut heartbeat =
        tokio::time::interval_at(epoch + props.heartbeat_interval(), props.heartbeat_interval());
    let mut monitored =
        tokio::time::interval_at(epoch + props.monitored_interval(), props.monitored_interval());
    let mut polled =
        tokio::time::interval_at(epoch + props.polled_interval(), props.polled_interval());

    let start = Instant::now();
    let mut last_monitored = start;
    let mut last_polled = start;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let event = StreamEvent::heartbeat(stream_id);
                counters.record(EventType::Heartbeat, 0);
                let _ = events_tx.send(event);
            }
            _ = monitored.tick(), if has_monitored => {
                let tick = Instant::now();
                let delta = collector.monitored_delta(last_monitored).await;
                last_monitored = tick;
                if !delta.is_empty() {
                    let event = StreamEvent::monitored(stream_id, &delta, precision);
                    counters.record(EventType::MonitoredValues, event.sample_count());
                    tracing::debug!(
                        stream = %stream_id,
                        channels = delta.len(),
                        "Monitored delta emitted"
                    );
                    let _ = events_tx.send(event);
                }
            }
            _ = polled.tick(), if has_polled => {
                let tick = Instant::now();
                let delta = collector.polled_delta(last_polled).await;
                last_polled = tick;
                if !delta.is_empty() {
                    let event = StreamEvent::polled(stream_id, &delta, precision);
                    counters.record(EventType::PolledValues, event.sample_count());
                    tracing::debug!(
                        stream = %stream_id,
                        channels = delta.len(),
                        "Polled delta emitted"
                    );
                    let _ = events_tx.send(event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::adapter::{SimAdapter, SimChannelSpec};
    use crate::config::GatewayConfig;
    use crate::ids::StreamIdAllocator;
    use crate::stream::descriptor::AcquisitionMode;

    use super::*;

    struct Fixture {
        adapter: Arc<SimAdapter>,
        mux: Arc<SubscriptionMultiplexer>,
        values: Arc<ChannelValueBuffer>,
        metadata: Arc<MetadataBuffer>,
        config: GatewayConfig,
        ids: StreamIdAllocator,
    }

    impl Fixture {
        async fn new() -> Self {
            let adapter = Arc::new(SimAdapter::new());
            let values = Arc::new(ChannelValueBuffer::new(64));
            let metadata = Arc::new(MetadataBuffer::new());
            let config = GatewayConfig::default().teardown_grace(Duration::from_millis(30));
            let mux = Arc::new(SubscriptionMultiplexer::new(
                adapter.clone(),
                values.clone(),
                metadata.clone(),
                &config,
            ));

            Self {
                adapter,
                mux,
                values,
                metadata,
                config,
                ids: StreamIdAllocator::new(),
            }
        }

        fn publisher(
            &self,
            channels: Vec<ChannelSpec>,
            properties: StreamProperties,
        ) -> StreamPublisher {
            let descriptor =
                StreamDescriptor::new(self.ids.allocate(), channels, properties).unwrap();
            StreamPublisher::new(
                descriptor,
                self.mux.clone(),
                self.values.clone(),
                self.metadata.clone(),
                self.config.event_queue_capacity,
            )
        }
    }

    async fn recv_within(
        rx: &mut broadcast::Receiver<StreamEvent>,
        ms: u64,
    ) -> Option<StreamEvent> {
        tokio::time::timeout(Duration::from_millis(ms), rx.recv())
            .await
            .ok()
            .and_then(|r| r.ok())
    }

    #[tokio::test]
    async fn test_lifecycle_violations_always_fail() {
        let f = Fixture::new().await;
        f.adapter.add_channel("ch", SimChannelSpec::default()).await;
        let publisher = f.publisher(vec![ChannelSpec::new("ch")], StreamProperties::default());

        // Shutdown before activation
        assert!(matches!(
            publisher.shutdown().await,
            Err(GatewayError::PublisherState { .. })
        ));

        publisher.activate().await.unwrap();
        assert_eq!(publisher.state().await, PublisherState::Active);

        // Second activation
        assert!(matches!(
            publisher.activate().await,
            Err(GatewayError::PublisherState { .. })
        ));

        publisher.shutdown().await.unwrap();
        assert_eq!(publisher.state().await, PublisherState::ShutDown);

        // Second shutdown
        assert!(matches!(
            publisher.shutdown().await,
            Err(GatewayError::PublisherState { .. })
        ));

        // Output after shutdown
        assert!(matches!(
            publisher.events().await,
            Err(GatewayError::PublisherState { .. })
        ));
    }

    #[tokio::test]
    async fn test_six_event_composition() {
        let f = Fixture::new().await;
        f.adapter
            .add_channel("pv", SimChannelSpec::default())
            .await;
        f.adapter
            .add_channel(
                "mv",
                SimChannelSpec::default().period(Duration::from_millis(50)),
            )
            .await;

        let publisher = f.publisher(
            vec![
                ChannelSpec::new("pv")
                    .mode(AcquisitionMode::Poll)
                    .poll_interval_ms(100),
                ChannelSpec::new("mv"),
            ],
            StreamProperties::default()
                .heartbeat_interval_ms(1400)
                .monitored_interval_ms(640)
                .polled_interval_ms(500)
                .metadata_delay_ms(0),
        );

        let mut rx = publisher.events().await.unwrap();
        publisher.activate().await.unwrap();

        let mut seen = Vec::new();
        while seen.len() < 6 {
            let event = recv_within(&mut rx, 2000).await.expect("event before timeout");
            seen.push(event.event_type);
        }

        assert_eq!(
            seen,
            vec![
                EventType::Metadata,
                EventType::PolledValues,
                EventType::MonitoredValues,
                EventType::PolledValues,
                EventType::MonitoredValues,
                EventType::Heartbeat,
            ]
        );

        publisher.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_metadata_first_and_only_once() {
        let f = Fixture::new().await;
        f.adapter
            .add_channel(
                "ch",
                SimChannelSpec::default().period(Duration::from_millis(10)),
            )
            .await;

        let publisher = f.publisher(
            vec![ChannelSpec::new("ch")],
            StreamProperties::default()
                .heartbeat_interval_ms(5000)
                .monitored_interval_ms(40),
        );
        let mut rx = publisher.events().await.unwrap();
        publisher.activate().await.unwrap();

        let first = recv_within(&mut rx, 500).await.unwrap();
        assert_eq!(first.event_type, EventType::Metadata);
        assert_eq!(first.stream_id, publisher.id());
        // Metadata covers the full channel set even before the source
        // described it
        assert!(first.payload.get("ch").is_some());

        let mut value_events = 0;
        while value_events < 3 {
            let event = recv_within(&mut rx, 500).await.unwrap();
            assert_ne!(event.event_type, EventType::Metadata);
            if event.event_type == EventType::MonitoredValues {
                value_events += 1;
            }
        }
        assert_eq!(publisher.stats().metadata_events, 1);

        publisher.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_heartbeat_fires_without_data() {
        let f = Fixture::new().await;
        // A channel that never produces a value within the test window
        f.adapter
            .add_channel(
                "quiet",
                SimChannelSpec::default().period(Duration::from_secs(30)),
            )
            .await;

        let publisher = f.publisher(
            vec![ChannelSpec::new("quiet")],
            StreamProperties::default()
                .heartbeat_interval_ms(60)
                .monitored_interval_ms(25),
        );
        let mut rx = publisher.events().await.unwrap();
        publisher.activate().await.unwrap();

        let first = recv_within(&mut rx, 500).await.unwrap();
        assert_eq!(first.event_type, EventType::Metadata);

        // Empty monitored ticks emit nothing; heartbeats keep coming
        for _ in 0..2 {
            let event = recv_within(&mut rx, 500).await.unwrap();
            assert_eq!(event.event_type, EventType::Heartbeat);
        }
        assert_eq!(publisher.stats().monitored_events, 0);

        publisher.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_releases_interest_but_consumers_do_not() {
        let f = Fixture::new().await;
        f.adapter.add_channel("ch", SimChannelSpec::default()).await;

        let publisher = f.publisher(vec![ChannelSpec::new("ch")], StreamProperties::default());
        let rx1 = publisher.events().await.unwrap();
        let rx2 = publisher.events().await.unwrap();
        publisher.activate().await.unwrap();
        assert_eq!(f.mux.interest_count("ch").await, 1);

        // One consumer detaching tears nothing down
        drop(rx1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(f.mux.interest_count("ch").await, 1);

        publisher.shutdown().await.unwrap();
        assert_eq!(f.mux.interest_count("ch").await, 0);

        drop(rx2);
    }

    #[tokio::test]
    async fn test_reload_swaps_properties_not_membership() {
        let f = Fixture::new().await;
        f.adapter.add_channel("ch", SimChannelSpec::default()).await;

        let publisher = f.publisher(vec![ChannelSpec::new("ch")], StreamProperties::default());

        // Reload before activation is a state violation
        assert!(matches!(
            publisher
                .reload(vec![ChannelSpec::new("ch")], StreamProperties::default())
                .await,
            Err(GatewayError::PublisherState { .. })
        ));

        publisher.activate().await.unwrap();
        assert_eq!(f.mux.interest_count("ch").await, 1);

        publisher
            .reload(
                vec![ChannelSpec::new("ch").mode(AcquisitionMode::PollMonitor)],
                StreamProperties::default().heartbeat_interval_ms(500),
            )
            .await
            .unwrap();
        // Interest is untouched by a reload
        assert_eq!(f.mux.interest_count("ch").await, 1);

        // Membership changes are configuration errors
        assert!(matches!(
            publisher
                .reload(
                    vec![ChannelSpec::new("other")],
                    StreamProperties::default()
                )
                .await,
            Err(GatewayError::Configuration(_))
        ));

        publisher.shutdown().await.unwrap();
    }
}
