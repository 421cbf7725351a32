//! Gateway facade
//!
//! Owns the shared infrastructure (adapter, buffers, multiplexer, id
//! allocator) and the table of live streams. The thin HTTP layer sitting
//! in front of this crate dispatches stream create/delete/reload requests
//! here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::adapter::ControlSystemAdapter;
use crate::buffer::{ChannelValueBuffer, MetadataBuffer};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::ids::{StreamId, StreamIdAllocator};
use crate::mux::SubscriptionMultiplexer;
use crate::stream::{
    ChannelSpec, PublisherState, StreamDescriptor, StreamProperties, StreamPublisher,
};

/// The streaming-distribution engine, one instance per process
pub struct Gateway {
    config: GatewayConfig,
    values: Arc<ChannelValueBuffer>,
    metadata: Arc<MetadataBuffer>,
    mux: Arc<SubscriptionMultiplexer>,
    streams: RwLock<HashMap<StreamId, Arc<StreamPublisher>>>,
    ids: StreamIdAllocator,
}

impl Gateway {
    /// Create a gateway on top of a control-system adapter
    pub fn new(adapter: Arc<dyn ControlSystemAdapter>, config: GatewayConfig) -> Self {
        let values = Arc::new(ChannelValueBuffer::new(config.buffer_capacity));
        let metadata = Arc::new(MetadataBuffer::new());
        let mux = Arc::new(SubscriptionMultiplexer::new(
            adapter,
            Arc::clone(&values),
            Arc::clone(&metadata),
            &config,
        ));

        Self {
            config,
            values,
            metadata,
            mux,
            streams: RwLock::new(HashMap::new()),
            ids: StreamIdAllocator::new(),
        }
    }

    /// Gateway configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Shared value buffer
    pub fn values(&self) -> &Arc<ChannelValueBuffer> {
        &self.values
    }

    /// Shared metadata store
    pub fn metadata(&self) -> &Arc<MetadataBuffer> {
        &self.metadata
    }

    /// Shared subscription multiplexer
    pub fn multiplexer(&self) -> &Arc<SubscriptionMultiplexer> {
        &self.mux
    }

    /// Create a stream from a decoded configuration request
    ///
    /// The descriptor is validated here; a malformed request fails this
    /// call and nothing else. The returned publisher is in the Created
    /// state so the caller can attach consumers before activating.
    pub async fn create_stream(
        &self,
        channels: Vec<ChannelSpec>,
        properties: StreamProperties,
    ) -> Result<Arc<StreamPublisher>> {
        let descriptor = StreamDescriptor::new(self.ids.allocate(), channels, properties)?;
        let id = descriptor.id();

        let publisher = Arc::new(StreamPublisher::new(
            descriptor,
            Arc::clone(&self.mux),
            Arc::clone(&self.values),
            Arc::clone(&self.metadata),
            self.config.event_queue_capacity,
        ));

        self.streams.write().await.insert(id, Arc::clone(&publisher));
        tracing::info!(stream = %id, "Stream created");
        Ok(publisher)
    }

    /// Look up a live stream
    pub async fn stream(&self, id: StreamId) -> Result<Arc<StreamPublisher>> {
        let streams = self.streams.read().await;
        streams
            .get(&id)
            .cloned()
            .ok_or(GatewayError::StreamNotFound(id))
    }

    /// Shut a stream down and remove it from the table
    pub async fn delete_stream(&self, id: StreamId) -> Result<()> {
        let publisher = {
            let mut streams = self.streams.write().await;
            streams.remove(&id).ok_or(GatewayError::StreamNotFound(id))?
        };

        if publisher.state().await == PublisherState::Active {
            publisher.shutdown().await?;
        }
        tracing::info!(stream = %id, "Stream deleted");
        Ok(())
    }

    /// Reload a stream's channel properties and intervals
    pub async fn reload_stream(
        &self,
        id: StreamId,
        channels: Vec<ChannelSpec>,
        properties: StreamProperties,
    ) -> Result<()> {
        let publisher = self.stream(id).await?;
        publisher.reload(channels, properties).await
    }

    /// Number of streams in the table
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Shut down every stream, e.g. at process exit
    pub async fn shutdown_all(&self) {
        let publishers: Vec<Arc<StreamPublisher>> = {
            let mut streams = self.streams.write().await;
            streams.drain().map(|(_, p)| p).collect()
        };

        for publisher in publishers {
            if publisher.state().await == PublisherState::Active {
                if let Err(e) = publisher.shutdown().await {
                    tracing::warn!(stream = %publisher.id(), error = %e, "Shutdown failed");
                }
            }
        }
        tracing::info!("All streams shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::adapter::{SimAdapter, SimChannelSpec};
    use crate::filter::FilterSpec;
    use crate::stream::EventType;

    use super::*;

    async fn gateway() -> (Arc<SimAdapter>, Gateway) {
        let adapter = Arc::new(SimAdapter::new());
        adapter
            .add_channel(
                "shared",
                SimChannelSpec::default().period(Duration::from_millis(10)),
            )
            .await;
        let config = GatewayConfig::default().teardown_grace(Duration::from_millis(30));
        let gw = Gateway::new(adapter.clone(), config);
        (adapter, gw)
    }

    #[tokio::test]
    async fn test_create_rejects_bad_configuration() {
        let (_adapter, gw) = gateway().await;

        let result = gw
            .create_stream(
                vec![ChannelSpec::new("shared").filter(FilterSpec::OneInN { n: 0 })],
                StreamProperties::default(),
            )
            .await;

        assert!(matches!(result, Err(GatewayError::Configuration(_))));
        assert_eq!(gw.stream_count().await, 0);
    }

    #[tokio::test]
    async fn test_streams_share_one_upstream_channel() {
        let (adapter, gw) = gateway().await;

        let a = gw
            .create_stream(vec![ChannelSpec::new("shared")], StreamProperties::default())
            .await
            .unwrap();
        let b = gw
            .create_stream(vec![ChannelSpec::new("shared")], StreamProperties::default())
            .await
            .unwrap();

        a.activate().await.unwrap();
        b.activate().await.unwrap();
        assert_eq!(gw.stream_count().await, 2);
        assert_eq!(gw.multiplexer().interest_count("shared").await, 2);
        assert_eq!(adapter.subscribe_count("shared").await, 1);

        // Deleting one stream leaves the channel live for the other
        gw.delete_stream(a.id()).await.unwrap();
        assert_eq!(gw.multiplexer().interest_count("shared").await, 1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(adapter.unsubscribe_count("shared").await, 0);

        gw.delete_stream(b.id()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(adapter.unsubscribe_count("shared").await, 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_stream() {
        let (_adapter, gw) = gateway().await;

        let a = gw
            .create_stream(vec![ChannelSpec::new("shared")], StreamProperties::default())
            .await
            .unwrap();
        gw.delete_stream(a.id()).await.unwrap();

        assert!(matches!(
            gw.delete_stream(a.id()).await,
            Err(GatewayError::StreamNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_never_activated_stream() {
        let (_adapter, gw) = gateway().await;

        let a = gw
            .create_stream(vec![ChannelSpec::new("shared")], StreamProperties::default())
            .await
            .unwrap();
        // No activation: delete just drops it from the table
        gw.delete_stream(a.id()).await.unwrap();
        assert_eq!(gw.stream_count().await, 0);
    }

    #[tokio::test]
    async fn test_end_to_end_event_flow() {
        let (_adapter, gw) = gateway().await;

        let publisher = gw
            .create_stream(
                vec![ChannelSpec::new("shared")],
                StreamProperties::default()
                    .heartbeat_interval_ms(5000)
                    .monitored_interval_ms(40),
            )
            .await
            .unwrap();

        let mut rx = publisher.events().await.unwrap();
        publisher.activate().await.unwrap();

        let first = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.event_type, EventType::Metadata);

        let second = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.event_type, EventType::MonitoredValues);
        assert!(second.sample_count() >= 1);

        gw.shutdown_all().await;
        assert_eq!(gw.stream_count().await, 0);
        assert_eq!(gw.multiplexer().interest_count("shared").await, 0);
    }

    #[tokio::test]
    async fn test_reload_through_gateway() {
        let (_adapter, gw) = gateway().await;

        let publisher = gw
            .create_stream(vec![ChannelSpec::new("shared")], StreamProperties::default())
            .await
            .unwrap();
        publisher.activate().await.unwrap();

        gw.reload_stream(
            publisher.id(),
            vec![ChannelSpec::new("shared").filter(FilterSpec::AllValue)],
            StreamProperties::default().monitored_interval_ms(200),
        )
        .await
        .unwrap();

        gw.shutdown_all().await;
    }
}
