//! Per-channel metadata store
//!
//! One slot per channel, last write wins. Channel types are treated as
//! fixed for a stream's lifetime, so readers only ever need the current
//! slot content.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::{GatewayError, Result};
use crate::sample::ChannelMetadata;

/// Last-write-wins metadata slots, one per channel
pub struct MetadataBuffer {
    slots: RwLock<HashMap<String, ChannelMetadata>>,
}

impl MetadataBuffer {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Store metadata for a channel, replacing any previous slot content
    pub async fn save(&self, channel: &str, metadata: ChannelMetadata) {
        let mut slots = self.slots.write().await;
        slots.insert(channel.to_string(), metadata);
    }

    /// Batch lookup; channels without a slot are omitted
    pub async fn get(&self, channels: &[String]) -> HashMap<String, ChannelMetadata> {
        let slots = self.slots.read().await;
        channels
            .iter()
            .filter_map(|name| slots.get(name).map(|m| (name.clone(), m.clone())))
            .collect()
    }

    /// Single-channel lookup that must already exist
    pub async fn get_one(&self, channel: &str) -> Result<ChannelMetadata> {
        let slots = self.slots.read().await;
        slots
            .get(channel)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownChannel(channel.to_string()))
    }
}

impl Default for MetadataBuffer {
    fn default() -> Self {
        Self::new()
    }
}
