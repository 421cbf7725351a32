//! Channel sample model
//!
//! One `ChannelSample` is a single timestamped observation of a channel:
//! its value (absent for disconnect markers), connection state, alarm
//! state, the source timestamp reported by the device, and the instant the
//! gateway received it. Receipt instants order the per-channel buffers.
//!
//! Samples are designed to be cheap to clone; the broadcast fan-out and
//! the buffers pass them by value.

pub mod metadata;
pub mod value;

pub use metadata::ChannelMetadata;
pub use value::SampleValue;

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde_json::{json, Value as Json};

/// Connection state of a channel at sample time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Channel was reachable
    Connected,
    /// Channel was unreachable or the source reported a fault
    Disconnected,
}

/// Alarm severity reported by the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlarmSeverity {
    /// No alarm condition
    NoAlarm,
    /// Minor alarm
    Minor,
    /// Major alarm
    Major,
    /// Value is invalid (also used for disconnects)
    Invalid,
}

impl AlarmSeverity {
    /// Severity tag used in payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmSeverity::NoAlarm => "NO_ALARM",
            AlarmSeverity::Minor => "MINOR",
            AlarmSeverity::Major => "MAJOR",
            AlarmSeverity::Invalid => "INVALID",
        }
    }
}

/// One timestamped observation of a channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSample {
    /// Observed value; absent for synthetic disconnect markers
    pub value: Option<SampleValue>,

    /// Connection state at observation time
    pub connection: ConnectionState,

    /// Alarm severity
    pub severity: AlarmSeverity,

    /// Alarm status text (e.g. "NO_ALARM", "HIGH", "DISCONNECTED")
    pub status: String,

    /// Timestamp reported by the source, epoch milliseconds
    pub source_ts_ms: u64,

    /// Instant the gateway received this sample
    pub received_at: Instant,
}

impl ChannelSample {
    /// Create a connected sample received now
    pub fn connected(value: SampleValue, source_ts_ms: u64) -> Self {
        Self::with_alarm(value, AlarmSeverity::NoAlarm, "NO_ALARM", source_ts_ms)
    }

    /// Create a connected sample with an explicit alarm state
    pub fn with_alarm(
        value: SampleValue,
        severity: AlarmSeverity,
        status: impl Into<String>,
        source_ts_ms: u64,
    ) -> Self {
        Self {
            value: Some(value),
            connection: ConnectionState::Connected,
            severity,
            status: status.into(),
            source_ts_ms,
            received_at: Instant::now(),
        }
    }

    /// Create a synthetic disconnect marker received now
    ///
    /// Written by the multiplexer when the upstream adapter fails; the
    /// value is absent and the alarm state marks the sample invalid.
    pub fn disconnected() -> Self {
        Self {
            value: None,
            connection: ConnectionState::Disconnected,
            severity: AlarmSeverity::Invalid,
            status: "DISCONNECTED".into(),
            source_ts_ms: epoch_millis(),
            received_at: Instant::now(),
        }
    }

    /// Whether the channel was reachable at observation time
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Scalar numeric reading, if the value has one
    pub fn numeric(&self) -> Option<f64> {
        self.value.as_ref().and_then(|v| v.as_f64())
    }

    /// Render to a JSON object, rounding doubles to `precision` digits
    pub fn to_json(&self, precision: Option<u32>) -> Json {
        json!({
            "val": self.value.as_ref().map_or(Json::Null, |v| v.to_json(precision)),
            "sevr": self.severity.as_str(),
            "stat": self.status,
            "conn": self.is_connected(),
            "ts": self.source_ts_ms,
        })
    }
}

/// Current wall-clock time as epoch milliseconds
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_sample() {
        let sample = ChannelSample::connected(SampleValue::Double(3.5), 1000);

        assert!(sample.is_connected());
        assert_eq!(sample.numeric(), Some(3.5));
        assert_eq!(sample.severity, AlarmSeverity::NoAlarm);
        assert_eq!(sample.source_ts_ms, 1000);
    }

    #[test]
    fn test_disconnected_marker() {
        let sample = ChannelSample::disconnected();

        assert!(!sample.is_connected());
        assert!(sample.value.is_none());
        assert_eq!(sample.severity, AlarmSeverity::Invalid);
        assert_eq!(sample.numeric(), None);
    }

    #[test]
    fn test_json_rendering() {
        let sample = ChannelSample::connected(SampleValue::Double(1.23456), 42);
        let json = sample.to_json(Some(2));

        assert_eq!(json["val"], 1.23);
        assert_eq!(json["sevr"], "NO_ALARM");
        assert_eq!(json["conn"], true);
        assert_eq!(json["ts"], 42);
    }

    #[test]
    fn test_json_disconnected() {
        let json = ChannelSample::disconnected().to_json(None);

        assert_eq!(json["val"], Json::Null);
        assert_eq!(json["sevr"], "INVALID");
        assert_eq!(json["conn"], false);
    }
}
