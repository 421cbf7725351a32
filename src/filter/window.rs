//! Pass-through and sliding-window samplers

use std::collections::VecDeque;

use crate::sample::ChannelSample;

use super::ValueSampler;

/// Identity sampler: every value survives
pub struct AllValue;

impl ValueSampler for AllValue {
    fn apply(&mut self, new_samples: Vec<ChannelSample>) -> Vec<ChannelSample> {
        new_samples
    }
}

/// Sliding window over the most recent `n` values seen across all calls
///
/// A call with fresh input returns the current window content in arrival
/// order; a call with empty input returns nothing and leaves the window
/// untouched.
pub struct LastN {
    window: VecDeque<ChannelSample>,
    capacity: usize,
}

impl LastN {
    /// Create a window of size `n` (n >= 1, checked at spec validation)
    pub fn new(n: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(n),
            capacity: n,
        }
    }
}

impl ValueSampler for LastN {
    fn apply(&mut self, new_samples: Vec<ChannelSample>) -> Vec<ChannelSample> {
        if new_samples.is_empty() {
            return Vec::new();
        }

        for sample in new_samples {
            if self.window.len() == self.capacity {
                self.window.pop_front();
            }
            self.window.push_back(sample);
        }

        self.window.iter().cloned().collect()
    }
}
