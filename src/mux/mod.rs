//! Subscription multiplexing
//!
//! Many client streams can reference the same physical channel; the
//! multiplexer makes sure the control system sees exactly one acquisition
//! per channel while any interest exists, and none once the last stream
//! lets go (after a grace delay absorbing resubscribe churn).
//!
//! # Architecture
//!
//! ```text
//!        stream A        stream B        stream C
//!           │               │               │
//!           └─ start/stop ──┼── start/stop ─┘
//!                           ▼
//!              SubscriptionMultiplexer
//!              channels: HashMap<name,
//!                Arc<Mutex<ChannelInterest>>>   count, live handle,
//!                           │                   pending teardown
//!              ┌────────────┴───────────┐
//!              ▼                        ▼
//!        adapter.subscribe()      poll timer task
//!              │                        │
//!              └──── ChannelUpdate ─────┘
//!                        │ (mpsc pump)
//!                        ▼
//!              value / metadata buffers
//! ```
//!
//! Adapter failures never escape these operations; they surface as
//! disconnected samples in the value buffer.

pub(crate) mod interest;
pub mod store;

pub use store::SubscriptionMultiplexer;
