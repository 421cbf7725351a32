//! Per-channel interest state
//!
//! One entry per physical channel, guarded by its own mutex so the
//! count-check-and-act sequence is atomic per channel without cross-channel
//! contention.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::adapter::SubscriptionHandle;
use crate::stream::descriptor::AcquisitionMode;

/// Interest bookkeeping for one physical channel
pub(crate) struct ChannelInterest {
    /// Number of client streams currently requiring this channel
    pub count: u32,

    /// Acquisition shape, fixed by the stream that raised interest 0 -> 1
    pub mode: AcquisitionMode,

    /// Upstream poll interval for poll-timer modes
    pub poll_interval: Duration,

    /// Live upstream push subscription, if established
    pub monitor: Option<SubscriptionHandle>,

    /// Recurring upstream poll task, if running
    pub poller: Option<JoinHandle<()>>,

    /// Grace timer scheduled at the 1 -> 0 transition; aborted if interest
    /// rises again before it fires
    pub pending_teardown: Option<JoinHandle<()>>,
}

impl ChannelInterest {
    pub fn new(mode: AcquisitionMode, poll_interval: Duration) -> Self {
        Self {
            count: 0,
            mode,
            poll_interval,
            monitor: None,
            poller: None,
            pending_teardown: None,
        }
    }

    /// Whether any upstream acquisition is currently live
    pub fn is_live(&self) -> bool {
        self.monitor.is_some() || self.poller.is_some()
    }

    /// Cancel a scheduled teardown, if one is pending
    pub fn cancel_teardown(&mut self) -> bool {
        match self.pending_teardown.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    /// Drop the live acquisition state, returning the push handle (if any)
    /// for the caller to unsubscribe upstream
    pub fn take_live(&mut self) -> Option<SubscriptionHandle> {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        self.pending_teardown = None;
        self.monitor.take()
    }
}
