//! Arrival-rate limiting sampler

use std::time::{Duration, Instant};

use crate::sample::ChannelSample;

use super::ValueSampler;

/// Emit a sample only if enough arrival time passed since the last emission
///
/// Spacing is measured on gateway receipt instants, so behavior is
/// deterministic for a given input sequence. The first sample is always
/// emitted.
pub struct RateLimiter {
    min_interval: Duration,
    last_emitted_at: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum spacing
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emitted_at: None,
        }
    }
}

impl ValueSampler for RateLimiter {
    fn apply(&mut self, new_samples: Vec<ChannelSample>) -> Vec<ChannelSample> {
        let mut survivors = Vec::new();

        for sample in new_samples {
            let due = match self.last_emitted_at {
                None => true,
                Some(last) => {
                    sample.received_at.saturating_duration_since(last) >= self.min_interval
                }
            };

            if due {
                self.last_emitted_at = Some(sample.received_at);
                survivors.push(sample);
            }
        }

        survivors
    }
}
