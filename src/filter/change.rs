//! Deadband change-detection sampler

use crate::sample::{ChannelSample, SampleValue};

use super::ValueSampler;

/// Emit only when the value moved by at least the deadband
///
/// The first sample is emitted unconditionally. After that, numeric values
/// must differ from the last emitted value by at least `deadband`;
/// non-numeric values (text, arrays, absent values) re-emit whenever they
/// differ from the last emitted value at all.
pub struct ChangeFilterer {
    deadband: f64,
    emitted_any: bool,
    last_value: Option<SampleValue>,
}

impl ChangeFilterer {
    /// Create a filterer with the given deadband (finite, positive)
    pub fn new(deadband: f64) -> Self {
        Self {
            deadband,
            emitted_any: false,
            last_value: None,
        }
    }

    fn is_change(&self, value: &Option<SampleValue>) -> bool {
        let current = value.as_ref().and_then(|v| v.as_f64());
        let previous = self.last_value.as_ref().and_then(|v| v.as_f64());

        match (current, previous) {
            (Some(a), Some(b)) => (a - b).abs() >= self.deadband,
            _ => *value != self.last_value,
        }
    }
}

impl ValueSampler for ChangeFilterer {
    fn apply(&mut self, new_samples: Vec<ChannelSample>) -> Vec<ChannelSample> {
        let mut survivors = Vec::new();

        for sample in new_samples {
            if !self.emitted_any || self.is_change(&sample.value) {
                self.emitted_any = true;
                self.last_value = sample.value.clone();
                survivors.push(sample);
            }
        }

        survivors
    }
}
