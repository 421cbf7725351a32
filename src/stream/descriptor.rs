//! Stream configuration
//!
//! A stream descriptor is the decoded form of one client subscription
//! request: the channel set with per-channel acquisition mode and filter,
//! plus stream-level interval defaults. The channel set is immutable after
//! creation; properties may be reloaded.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};
use crate::filter::FilterSpec;
use crate::ids::StreamId;

/// How values for a channel are acquired from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionMode {
    /// Pull: the gateway reads the channel at a fixed interval
    Poll,
    /// Push: the source notifies on every change
    Monitor,
    /// Push upstream, but clients sample the cached latest value at their
    /// polled cadence
    PollMonitor,
    /// Both acquisitions live simultaneously
    PollAndMonitor,
}

impl AcquisitionMode {
    /// Whether this mode establishes an upstream push subscription
    pub fn uses_push(&self) -> bool {
        matches!(
            self,
            AcquisitionMode::Monitor | AcquisitionMode::PollMonitor | AcquisitionMode::PollAndMonitor
        )
    }

    /// Whether this mode runs an upstream poll timer
    pub fn uses_poll_timer(&self) -> bool {
        matches!(self, AcquisitionMode::Poll | AcquisitionMode::PollAndMonitor)
    }

    /// Whether the channel contributes to polled-delta events
    pub fn polled_delivery(&self) -> bool {
        matches!(
            self,
            AcquisitionMode::Poll | AcquisitionMode::PollMonitor | AcquisitionMode::PollAndMonitor
        )
    }

    /// Whether the channel contributes to monitored-delta events
    pub fn monitored_delivery(&self) -> bool {
        matches!(self, AcquisitionMode::Monitor | AcquisitionMode::PollAndMonitor)
    }
}

fn default_mode() -> AcquisitionMode {
    AcquisitionMode::Monitor
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// One channel entry of a stream request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Channel name in the external control system
    pub name: String,

    /// Acquisition mode
    #[serde(default = "default_mode")]
    pub mode: AcquisitionMode,

    /// Data-reduction filter for this channel
    #[serde(default)]
    pub filter: FilterSpec,

    /// Upstream poll interval, used by poll-timer modes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl ChannelSpec {
    /// Monitored channel with the default latest-value filter
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: default_mode(),
            filter: FilterSpec::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    /// Set the acquisition mode
    pub fn mode(mut self, mode: AcquisitionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the filter
    pub fn filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    /// Set the upstream poll interval in milliseconds
    pub fn poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Upstream poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Stream-level interval defaults and rendering options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamProperties {
    /// Heartbeat period, milliseconds
    pub heartbeat_interval_ms: u64,

    /// Delay before the one-shot metadata event, milliseconds
    pub metadata_delay_ms: u64,

    /// Monitored-delta flush period, milliseconds
    pub monitored_interval_ms: u64,

    /// Polled-delta flush period, milliseconds
    pub polled_interval_ms: u64,

    /// Decimal digits for double values in payloads
    pub numeric_precision: Option<u32>,
}

impl Default for StreamProperties {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 15_000,
            metadata_delay_ms: 0,
            monitored_interval_ms: 100,
            polled_interval_ms: 1000,
            numeric_precision: Some(6),
        }
    }
}

impl StreamProperties {
    /// Set the heartbeat period
    pub fn heartbeat_interval_ms(mut self, ms: u64) -> Self {
        self.heartbeat_interval_ms = ms;
        self
    }

    /// Set the metadata delay
    pub fn metadata_delay_ms(mut self, ms: u64) -> Self {
        self.metadata_delay_ms = ms;
        self
    }

    /// Set the monitored-delta flush period
    pub fn monitored_interval_ms(mut self, ms: u64) -> Self {
        self.monitored_interval_ms = ms;
        self
    }

    /// Set the polled-delta flush period
    pub fn polled_interval_ms(mut self, ms: u64) -> Self {
        self.polled_interval_ms = ms;
        self
    }

    /// Set the numeric payload precision
    pub fn numeric_precision(mut self, digits: u32) -> Self {
        self.numeric_precision = Some(digits);
        self
    }

    /// Heartbeat period as a duration
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Metadata delay as a duration
    pub fn metadata_delay(&self) -> Duration {
        Duration::from_millis(self.metadata_delay_ms)
    }

    /// Monitored-delta period as a duration
    pub fn monitored_interval(&self) -> Duration {
        Duration::from_millis(self.monitored_interval_ms)
    }

    /// Polled-delta period as a duration
    pub fn polled_interval(&self) -> Duration {
        Duration::from_millis(self.polled_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_ms == 0 {
            return Err(GatewayError::Configuration(
                "heartbeat interval must be non-zero".into(),
            ));
        }
        if self.monitored_interval_ms == 0 || self.polled_interval_ms == 0 {
            return Err(GatewayError::Configuration(
                "delta flush intervals must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Validated configuration of one client stream
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    id: StreamId,
    channels: Vec<ChannelSpec>,
    properties: StreamProperties,
}

impl StreamDescriptor {
    /// Validate and build a descriptor
    ///
    /// Rejects an empty channel set, blank or duplicate channel names,
    /// invalid filter parameters, and zero intervals.
    pub fn new(
        id: StreamId,
        channels: Vec<ChannelSpec>,
        properties: StreamProperties,
    ) -> Result<Self> {
        if channels.is_empty() {
            return Err(GatewayError::Configuration(
                "stream has no channels".into(),
            ));
        }

        let mut seen = HashSet::new();
        for spec in &channels {
            if spec.name.trim().is_empty() {
                return Err(GatewayError::Configuration(
                    "channel name must not be blank".into(),
                ));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(GatewayError::Configuration(format!(
                    "duplicate channel: {}",
                    spec.name
                )));
            }
            spec.filter.validate()?;
            if spec.mode.uses_poll_timer() && spec.poll_interval_ms == 0 {
                return Err(GatewayError::Configuration(format!(
                    "channel {}: poll interval must be non-zero",
                    spec.name
                )));
            }
        }
        properties.validate()?;

        Ok(Self {
            id,
            channels,
            properties,
        })
    }

    /// Rebuild this descriptor with new channel properties
    ///
    /// Channel membership is immutable: the new specs must cover exactly
    /// the same channel names, otherwise the reload is rejected.
    pub fn reconfigured(
        &self,
        channels: Vec<ChannelSpec>,
        properties: StreamProperties,
    ) -> Result<Self> {
        let old: HashSet<&str> = self.channels.iter().map(|c| c.name.as_str()).collect();
        let new: HashSet<&str> = channels.iter().map(|c| c.name.as_str()).collect();
        if old != new {
            return Err(GatewayError::Configuration(
                "stream channel membership cannot change on reload".into(),
            ));
        }
        Self::new(self.id, channels, properties)
    }

    /// Stream id
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// All channel entries
    pub fn channels(&self) -> &[ChannelSpec] {
        &self.channels
    }

    /// Stream-level properties
    pub fn properties(&self) -> &StreamProperties {
        &self.properties
    }

    /// All channel names
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }

    /// Channels delivered through polled-delta events
    pub fn polled_channels(&self) -> Vec<&ChannelSpec> {
        self.channels
            .iter()
            .filter(|c| c.mode.polled_delivery())
            .collect()
    }

    /// Channels delivered through monitored-delta events
    pub fn monitored_channels(&self) -> Vec<&ChannelSpec> {
        self.channels
            .iter()
            .filter(|c| c.mode.monitored_delivery())
            .collect()
    }

    /// Whether any channel is delivered through the polled path
    pub fn has_polled(&self) -> bool {
        self.channels.iter().any(|c| c.mode.polled_delivery())
    }

    /// Whether any channel is delivered through the monitored path
    pub fn has_monitored(&self) -> bool {
        self.channels.iter().any(|c| c.mode.monitored_delivery())
    }
}
