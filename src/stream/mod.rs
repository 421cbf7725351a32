//! Client stream engine
//!
//! Everything that turns buffered channel data into one client's ordered
//! event stream: the validated stream configuration, the per-stream
//! collector applying data-reduction filters, and the publisher state
//! machine driving the periodic event composition.
//!
//! # Architecture
//!
//! ```text
//!                     StreamPublisher (one owned task)
//!              ┌──────────────────────────────────────────┐
//!              │  metadata (once)                         │
//!              │  heartbeat ──────── every hb interval ───┼──► StreamEvent
//!              │  monitored-delta ── every mon interval ──┼──► StreamEvent
//!              │  polled-delta ───── every poll interval ─┼──► StreamEvent
//!              └───────────────┬──────────────────────────┘
//!                              │ ticks
//!                              ▼
//!                       StreamCollector
//!              buffers.later_than / latest  ──►  per-channel sampler
//! ```
//!
//! Events fan out over a `tokio::sync::broadcast` channel: many consumers,
//! best-effort delivery, and a detaching consumer never affects others.

pub mod collector;
pub mod descriptor;
pub mod event;
pub mod publisher;
pub mod stats;

pub use collector::StreamCollector;
pub use descriptor::{AcquisitionMode, ChannelSpec, StreamDescriptor, StreamProperties};
pub use event::{EventType, StreamEvent};
pub use publisher::{PublisherState, StreamPublisher};
pub use stats::PublisherStats;
