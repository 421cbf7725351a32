//! Per-channel stores
//!
//! Two stores back the streaming engine: a bounded, time-ordered sample
//! buffer answering "changed since" queries, and a last-write-wins
//! metadata slot per channel. Writes arrive from the multiplexer's update
//! pump; reads come from publisher timer ticks. Per-channel lock isolation
//! keeps unrelated channels from contending.

pub mod metadata;
pub mod values;

pub use metadata::MetadataBuffer;
pub use values::ChannelValueBuffer;
