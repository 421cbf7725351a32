//! Control-system adapter boundary
//!
//! The gateway consumes the physical channel-access client exclusively
//! through this interface: push subscriptions deliver value and metadata
//! updates into an mpsc sink, and polls request one value on demand.
//!
//! Adapter failures stop at the multiplexer: they are converted into
//! synthetic disconnected samples and never escape as errors.

pub mod sim;

pub use sim::{SimAdapter, SimChannelSpec};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::sample::{ChannelMetadata, ChannelSample};

/// Handle for one live upstream subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Wrap a raw handle value
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// One update pushed by the adapter into the gateway
#[derive(Debug, Clone)]
pub enum ChannelUpdate {
    /// A new value observation
    Value {
        /// Channel the sample belongs to
        channel: String,
        /// The observation
        sample: ChannelSample,
    },
    /// New or changed channel metadata
    Metadata {
        /// Channel the metadata describes
        channel: String,
        /// The descriptive record
        metadata: ChannelMetadata,
    },
}

/// Sink the adapter pushes updates into
pub type UpdateSink = mpsc::Sender<ChannelUpdate>;

/// Failure reported by the upstream adapter
///
/// Consumed inside the multiplexer only; downstream it is visible as a
/// disconnected sample.
#[derive(Debug, Clone)]
pub struct AdapterError {
    /// Channel the failure relates to
    pub channel: String,
    /// Failure description
    pub message: String,
}

impl AdapterError {
    /// Create an error for a channel
    pub fn new(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Adapter failure on channel {}: {}", self.channel, self.message)
    }
}

impl std::error::Error for AdapterError {}

/// The physical channel-access client, as seen by this subsystem
#[async_trait]
pub trait ControlSystemAdapter: Send + Sync {
    /// Begin push-based monitoring of a channel
    ///
    /// Every value change and metadata update is pushed into `updates`
    /// until the returned handle is passed to `unsubscribe`.
    async fn subscribe(
        &self,
        channel: &str,
        updates: UpdateSink,
    ) -> std::result::Result<SubscriptionHandle, AdapterError>;

    /// Tear down a push subscription
    async fn unsubscribe(&self, handle: SubscriptionHandle);

    /// Request one value read of a channel
    async fn poll_once(&self, channel: &str)
        -> std::result::Result<ChannelSample, AdapterError>;
}
