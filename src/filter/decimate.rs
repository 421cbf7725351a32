//! Group-based decimation samplers
//!
//! Both samplers here share the complete-group discipline: inputs are
//! counted into consecutive groups of fixed length, a group only produces
//! output once it completes, and an incomplete trailing group never emits.
//! Group position persists across calls.

use crate::sample::{ChannelSample, SampleValue};

use super::ValueSampler;

/// Emit the first value of each complete group of `n` consecutive inputs
pub struct OneInN {
    group: usize,
    seen: usize,
    pending: Option<ChannelSample>,
}

impl OneInN {
    /// Create a decimator with group length `n` (n >= 1)
    pub fn new(n: usize) -> Self {
        Self {
            group: n,
            seen: 0,
            pending: None,
        }
    }
}

impl ValueSampler for OneInN {
    fn apply(&mut self, new_samples: Vec<ChannelSample>) -> Vec<ChannelSample> {
        let mut survivors = Vec::new();

        for sample in new_samples {
            if self.seen == 0 {
                self.pending = Some(sample);
            }
            self.seen += 1;

            if self.seen == self.group {
                if let Some(first) = self.pending.take() {
                    survivors.push(first);
                }
                self.seen = 0;
            }
        }

        survivors
    }
}

/// Emit the arithmetic mean of each complete group of `window` inputs
///
/// Defined for numeric values only. Samples without a numeric reading
/// (text, arrays, disconnect markers) are forwarded unchanged and do not
/// join a group, so connection-state transitions still reach the client.
pub struct Averager {
    window: usize,
    filled: usize,
    sum: f64,
}

impl Averager {
    /// Create an averager with group length `window` (window >= 1)
    pub fn new(window: usize) -> Self {
        Self {
            window,
            filled: 0,
            sum: 0.0,
        }
    }
}

impl ValueSampler for Averager {
    fn apply(&mut self, new_samples: Vec<ChannelSample>) -> Vec<ChannelSample> {
        let mut survivors = Vec::new();

        for sample in new_samples {
            let Some(v) = sample.numeric() else {
                survivors.push(sample);
                continue;
            };

            self.sum += v;
            self.filled += 1;

            if self.filled == self.window {
                let mean = self.sum / self.window as f64;
                let mut averaged = sample;
                averaged.value = Some(SampleValue::Double(mean));
                survivors.push(averaged);

                self.sum = 0.0;
                self.filled = 0;
            }
        }

        survivors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[f64]) -> Vec<ChannelSample> {
        values
            .iter()
            .map(|v| ChannelSample::connected(SampleValue::Double(*v), 0))
            .collect()
    }

    fn doubles(out: &[ChannelSample]) -> Vec<f64> {
        out.iter()
            .map(|s| s.numeric().expect("numeric value"))
            .collect()
    }

    #[test]
    fn test_one_in_n_single_batch() {
        let mut sampler = OneInN::new(3);

        // 7 inputs, floor(7/3) = 2 complete groups, first element of each
        let out = sampler.apply(samples(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]));
        assert_eq!(doubles(&out), vec![1.0, 4.0]);
    }

    #[test]
    fn test_one_in_n_across_batches() {
        // Group position persists: any batch split of the same sequence
        // produces the same emissions
        let mut sampler = OneInN::new(3);

        assert!(sampler.apply(samples(&[1.0])).is_empty());
        assert!(sampler.apply(samples(&[2.0])).is_empty());
        assert_eq!(doubles(&sampler.apply(samples(&[3.0, 4.0]))), vec![1.0]);
        assert_eq!(doubles(&sampler.apply(samples(&[5.0, 6.0, 7.0]))), vec![4.0]);
    }

    #[test]
    fn test_one_in_n_floor_count() {
        for n in 1..=5usize {
            let mut sampler = OneInN::new(n);
            let total = 17usize;
            let inputs: Vec<f64> = (0..total).map(|i| i as f64).collect();

            let mut emitted = 0;
            // Deliver one at a time, the least favorable split
            for chunk in inputs.chunks(1) {
                emitted += sampler.apply(samples(chunk)).len();
            }
            assert_eq!(emitted, total / n, "group length {}", n);
        }
    }

    #[test]
    fn test_one_in_one_is_identity() {
        let mut sampler = OneInN::new(1);

        let out = sampler.apply(samples(&[1.0, 2.0, 3.0]));
        assert_eq!(doubles(&out), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_incomplete_trailing_group_never_emits() {
        let mut sampler = OneInN::new(4);

        assert!(sampler.apply(samples(&[1.0, 2.0, 3.0])).is_empty());
        assert!(sampler.apply(Vec::new()).is_empty());
    }

    #[test]
    fn test_averager_means() {
        let mut sampler = Averager::new(2);

        let out = sampler.apply(samples(&[1.0, 3.0, 10.0, 20.0, 99.0]));
        assert_eq!(doubles(&out), vec![2.0, 15.0]);

        // The trailing 99.0 completes a group with the next input
        let out = sampler.apply(samples(&[101.0]));
        assert_eq!(doubles(&out), vec![100.0]);
    }

    #[test]
    fn test_averager_forwards_non_numeric() {
        let mut sampler = Averager::new(2);

        let mut input = samples(&[1.0]);
        input.push(ChannelSample::disconnected());
        input.extend(samples(&[3.0]));

        let out = sampler.apply(input);
        // Disconnect marker forwarded in place, group completes on 3.0
        assert_eq!(out.len(), 2);
        assert!(!out[0].is_connected());
        assert_eq!(out[1].numeric(), Some(2.0));
    }

    #[test]
    fn test_averager_empty_input() {
        let mut sampler = Averager::new(3);
        assert!(sampler.apply(Vec::new()).is_empty());
    }
}
