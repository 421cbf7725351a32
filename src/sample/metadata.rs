//! Channel metadata
//!
//! Descriptive, slowly-changing information about a channel. The metadata
//! store keeps one slot per channel, last write wins.

use serde_json::{json, Value as Json};

use super::value::SampleValue;

/// Descriptive record for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMetadata {
    /// Data type tag (e.g. "DOUBLE", "LONG_ARRAY")
    pub data_type: String,

    /// Engineering units
    pub units: Option<String>,

    /// Display precision suggested by the source
    pub precision: Option<u32>,

    /// Lower display limit
    pub display_low: Option<f64>,

    /// Upper display limit
    pub display_high: Option<f64>,
}

impl ChannelMetadata {
    /// Create metadata with just a data type tag
    pub fn of_type(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            units: None,
            precision: None,
            display_low: None,
            display_high: None,
        }
    }

    /// Metadata derived from a value's shape
    pub fn for_value(value: &SampleValue) -> Self {
        Self::of_type(value.kind())
    }

    /// Placeholder for channels the source has not described yet
    pub fn unknown() -> Self {
        Self::of_type("UNKNOWN")
    }

    /// Set engineering units
    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Set display precision
    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Set display limits
    pub fn display_range(mut self, low: f64, high: f64) -> Self {
        self.display_low = Some(low);
        self.display_high = Some(high);
        self
    }

    /// Render to a JSON object
    pub fn to_json(&self) -> Json {
        let mut obj = json!({ "type": self.data_type });
        if let Some(map) = obj.as_object_mut() {
            if let Some(ref units) = self.units {
                map.insert("egu".into(), json!(units));
            }
            if let Some(prec) = self.precision {
                map.insert("prec".into(), json!(prec));
            }
            if let Some(low) = self.display_low {
                map.insert("lopr".into(), json!(low));
            }
            if let Some(high) = self.display_high {
                map.insert("hopr".into(), json!(high));
            }
        }
        obj
    }
}
