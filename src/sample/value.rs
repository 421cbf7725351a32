//! Sample value types
//!
//! All channel value shapes share a single tagged representation. The
//! scalar/array and integer/real/string combinations are variants of one
//! enum matched exhaustively at consumption points.

use serde_json::Value as Json;

/// Unified channel value representation
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    /// 64-bit signed integer scalar
    Long(i64),

    /// IEEE 754 double-precision scalar
    Double(f64),

    /// UTF-8 string scalar
    Text(String),

    /// Integer waveform
    LongArray(Vec<i64>),

    /// Double-precision waveform
    DoubleArray(Vec<f64>),
}

impl SampleValue {
    /// Data type tag, as reported in channel metadata
    pub fn kind(&self) -> &'static str {
        match self {
            SampleValue::Long(_) => "LONG",
            SampleValue::Double(_) => "DOUBLE",
            SampleValue::Text(_) => "TEXT",
            SampleValue::LongArray(_) => "LONG_ARRAY",
            SampleValue::DoubleArray(_) => "DOUBLE_ARRAY",
        }
    }

    /// Try to get this value as a number
    ///
    /// Arrays and text have no scalar numeric reading.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SampleValue::Long(v) => Some(*v as f64),
            SampleValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get this value as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SampleValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value has a scalar numeric reading
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Render to JSON, rounding double values to `precision` decimal digits
    ///
    /// Non-finite doubles render as null since JSON has no representation
    /// for them.
    pub fn to_json(&self, precision: Option<u32>) -> Json {
        match self {
            SampleValue::Long(v) => Json::from(*v),
            SampleValue::Double(v) => double_json(*v, precision),
            SampleValue::Text(s) => Json::from(s.clone()),
            SampleValue::LongArray(vs) => Json::from(vs.clone()),
            SampleValue::DoubleArray(vs) => {
                Json::Array(vs.iter().map(|v| double_json(*v, precision)).collect())
            }
        }
    }
}

impl std::fmt::Display for SampleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleValue::Long(v) => write!(f, "{}", v),
            SampleValue::Double(v) => write!(f, "{}", v),
            SampleValue::Text(s) => write!(f, "{}", s),
            SampleValue::LongArray(vs) => write!(f, "{:?}", vs),
            SampleValue::DoubleArray(vs) => write!(f, "{:?}", vs),
        }
    }
}

fn double_json(v: f64, precision: Option<u32>) -> Json {
    if !v.is_finite() {
        return Json::Null;
    }
    let rounded = match precision {
        Some(p) => {
            let factor = 10f64.powi(p as i32);
            (v * factor).round() / factor
        }
        None => v,
    };
    serde_json::Number::from_f64(rounded).map_or(Json::Null, Json::Number)
}
