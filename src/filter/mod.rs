//! Data-reduction filters
//!
//! A sampler decides which values survive from a fast source into a client
//! stream. Each stream channel gets its own sampler instance per delivery
//! category, built once from its `FilterSpec` at stream creation.
//!
//! Samplers are stateful across calls (they retain last-emitted state) and
//! carry no internal locking: the publisher task is the single sequential
//! caller.

pub mod change;
pub mod decimate;
pub mod rate;
pub mod window;

pub use change::ChangeFilterer;
pub use decimate::{Averager, OneInN};
pub use rate::RateLimiter;
pub use window::{AllValue, LastN};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};
use crate::sample::ChannelSample;

/// Filter selection for one stream channel
///
/// A closed tagged choice, decoded once at stream creation and matched
/// exhaustively to construct exactly one sampler instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "kebab-case")]
pub enum FilterSpec {
    /// Pass every value through unchanged
    AllValue,
    /// Sliding window over the most recent `n` values
    LastN {
        /// Window size
        n: usize,
    },
    /// Emit the first value of each complete group of `n` consecutive inputs
    OneInN {
        /// Group length
        n: usize,
    },
    /// Emit at most one value per `interval_ms` of arrival time
    RateLimiter {
        /// Minimum spacing between emitted values, milliseconds
        interval_ms: u64,
    },
    /// Emit only when the value moved by at least `deadband`
    ChangeFilterer {
        /// Minimum numeric change required to re-emit
        deadband: f64,
    },
    /// Emit the arithmetic mean of each complete group of `window` inputs
    Averager {
        /// Group length
        window: usize,
    },
}

impl FilterSpec {
    /// Check parameters; raised synchronously at stream creation
    pub fn validate(&self) -> Result<()> {
        match self {
            FilterSpec::AllValue => Ok(()),
            FilterSpec::LastN { n } | FilterSpec::OneInN { n } => {
                if *n == 0 {
                    Err(GatewayError::Configuration(format!(
                        "{:?}: group/window size must be at least 1",
                        self
                    )))
                } else {
                    Ok(())
                }
            }
            FilterSpec::RateLimiter { interval_ms } => {
                if *interval_ms == 0 {
                    Err(GatewayError::Configuration(
                        "rate-limiter: interval must be non-zero".into(),
                    ))
                } else {
                    Ok(())
                }
            }
            FilterSpec::ChangeFilterer { deadband } => {
                if !deadband.is_finite() || *deadband <= 0.0 {
                    Err(GatewayError::Configuration(format!(
                        "change-filterer: deadband must be finite and positive, got {}",
                        deadband
                    )))
                } else {
                    Ok(())
                }
            }
            FilterSpec::Averager { window } => {
                if *window == 0 {
                    Err(GatewayError::Configuration(
                        "averager: window must be at least 1".into(),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl Default for FilterSpec {
    /// Latest-value delivery: a window of one
    fn default() -> Self {
        FilterSpec::LastN { n: 1 }
    }
}

/// Stateful reduction of a batch of new samples to survivors
pub trait ValueSampler: Send + Sync {
    /// Reduce `new_samples` to the values that survive into the stream
    ///
    /// An empty input always yields an empty output, whatever state the
    /// sampler holds.
    fn apply(&mut self, new_samples: Vec<ChannelSample>) -> Vec<ChannelSample>;
}

/// Construct the sampler instance for a validated spec
pub fn build_sampler(spec: &FilterSpec) -> Box<dyn ValueSampler> {
    match spec {
        FilterSpec::AllValue => Box::new(AllValue),
        FilterSpec::LastN { n } => Box::new(LastN::new(*n)),
        FilterSpec::OneInN { n } => Box::new(OneInN::new(*n)),
        FilterSpec::RateLimiter { interval_ms } => {
            Box::new(RateLimiter::new(Duration::from_millis(*interval_ms)))
        }
        FilterSpec::ChangeFilterer { deadband } => Box::new(ChangeFilterer::new(*deadband)),
        FilterSpec::Averager { window } => Box::new(Averager::new(*window)),
    }
}
