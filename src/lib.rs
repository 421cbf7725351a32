//! streamgate: control-system live-value streaming gateway
//!
//! Continuously multiplexes live values from a process-control data source
//! (many independent hardware channels) to many concurrent subscribers
//! over unidirectional event streams, applying per-channel data-reduction
//! policies so a fast source cannot overwhelm a slow client.
//!
//! # Architecture
//!
//! ```text
//!   control system ──► adapter ──► SubscriptionMultiplexer
//!                                   (interest counts, grace teardown)
//!                                           │
//!                                           ▼
//!                              value / metadata buffers
//!                              (bounded, per-channel, time-ordered)
//!                                           │ timer ticks
//!                                           ▼
//!                     StreamCollector ──► ValueSampler (per channel)
//!                                           │
//!                                           ▼
//!                     StreamPublisher ──► StreamEvent ──► encoder layer
//! ```
//!
//! Any number of client streams can reference the same physical channel;
//! the multiplexer keeps exactly one upstream acquisition per channel
//! while interest exists. Each stream composes its own ordered output:
//! one metadata event, then heartbeat / polled-delta / monitored-delta
//! events at independently configured intervals.
//!
//! Wire framing, the channel-access protocol client, and the HTTP request
//! handlers live outside this crate; see [`adapter::ControlSystemAdapter`]
//! for the upstream seam and [`stream::StreamEvent`] for the downstream
//! one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use streamgate::adapter::{SimAdapter, SimChannelSpec};
//! use streamgate::{ChannelSpec, Gateway, GatewayConfig, StreamProperties};
//!
//! # async fn demo() -> streamgate::Result<()> {
//! let adapter = Arc::new(SimAdapter::new());
//! adapter.add_channel("TEMP:1", SimChannelSpec::default()).await;
//!
//! let gateway = Gateway::new(adapter, GatewayConfig::default());
//! let publisher = gateway
//!     .create_stream(vec![ChannelSpec::new("TEMP:1")], StreamProperties::default())
//!     .await?;
//!
//! let mut events = publisher.events().await?;
//! publisher.activate().await?;
//! while let Ok(event) = events.recv().await {
//!     println!("{}: {}", event.event_type, event.payload);
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod buffer;
pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod ids;
pub mod mux;
pub mod sample;
pub mod stream;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use gateway::Gateway;
pub use ids::{StreamId, StreamIdAllocator};
pub use sample::{AlarmSeverity, ChannelMetadata, ChannelSample, ConnectionState, SampleValue};
pub use stream::{
    AcquisitionMode, ChannelSpec, EventType, PublisherState, StreamEvent, StreamProperties,
    StreamPublisher,
};
