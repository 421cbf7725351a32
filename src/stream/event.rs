//! Output stream events
//!
//! One `StreamEvent` is the unit handed to the downstream encoder/transport
//! layer. Events are designed to be cheap to clone for broadcast fan-out;
//! the payload is built completely before the event is emitted, so no
//! partial payload is ever observable.

use std::collections::HashMap;

use serde_json::{json, Map, Value as Json};

use crate::ids::StreamId;
use crate::sample::{epoch_millis, ChannelMetadata, ChannelSample};

/// Category of a stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// One-shot channel metadata, first event of every stream
    Metadata,
    /// Periodic liveness signal, emitted regardless of content
    Heartbeat,
    /// Value changes of monitored channels
    MonitoredValues,
    /// Value changes of polled channels
    PolledValues,
}

impl EventType {
    /// Wire tag of this event category
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Metadata => "channel-metadata",
            EventType::Heartbeat => "heartbeat",
            EventType::MonitoredValues => "monitored-values",
            EventType::PolledValues => "polled-values",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record on a stream's output
#[derive(Debug, Clone)]
pub struct StreamEvent {
    /// Event category
    pub event_type: EventType,

    /// Human-readable comment for wire-level debugging
    pub comment: String,

    /// Stream this event belongs to
    pub stream_id: StreamId,

    /// Complete JSON payload
    pub payload: Json,
}

impl StreamEvent {
    /// Metadata event from a per-channel metadata map
    pub fn metadata(stream_id: StreamId, metadata: &HashMap<String, ChannelMetadata>) -> Self {
        let mut obj = Map::new();
        for (channel, meta) in metadata {
            obj.insert(channel.clone(), meta.to_json());
        }
        Self {
            event_type: EventType::Metadata,
            comment: "channel metadata".into(),
            stream_id,
            payload: Json::Object(obj),
        }
    }

    /// Monitored-delta event from a per-channel sample-list map
    pub fn monitored(
        stream_id: StreamId,
        delta: &HashMap<String, Vec<ChannelSample>>,
        precision: Option<u32>,
    ) -> Self {
        Self {
            event_type: EventType::MonitoredValues,
            comment: "monitored channel values".into(),
            stream_id,
            payload: values_payload(delta, precision),
        }
    }

    /// Polled-delta event from a per-channel sample-list map
    pub fn polled(
        stream_id: StreamId,
        delta: &HashMap<String, Vec<ChannelSample>>,
        precision: Option<u32>,
    ) -> Self {
        Self {
            event_type: EventType::PolledValues,
            comment: "polled channel values".into(),
            stream_id,
            payload: values_payload(delta, precision),
        }
    }

    /// Heartbeat event carrying the current gateway time
    pub fn heartbeat(stream_id: StreamId) -> Self {
        Self {
            event_type: EventType::Heartbeat,
            comment: "heartbeat".into(),
            stream_id,
            payload: json!(epoch_millis()),
        }
    }

    /// Number of samples carried in the payload
    pub fn sample_count(&self) -> usize {
        match self.payload.as_object() {
            Some(obj) => obj
                .values()
                .map(|v| v.as_array().map_or(0, |a| a.len()))
                .sum(),
            None => 0,
        }
    }
}

fn values_payload(delta: &HashMap<String, Vec<ChannelSample>>, precision: Option<u32>) -> Json {
    let mut obj = Map::new();
    for (channel, samples) in delta {
        let list: Vec<Json> = samples.iter().map(|s| s.to_json(precision)).collect();
        obj.insert(channel.clone(), Json::Array(list));
    }
    Json::Object(obj)
}
