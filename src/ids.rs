//! Stream id allocation
//!
//! Ids are issued by an allocator instance owned by the gateway rather than
//! a process-wide static, so tests can construct and reset their own.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Opaque identifier for one client stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StreamId(u64);

impl StreamId {
    /// Raw numeric value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic allocator for stream ids
#[derive(Debug)]
pub struct StreamIdAllocator {
    next: AtomicU64,
}

impl StreamIdAllocator {
    /// Create an allocator starting at id 1
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Issue the next id
    pub fn allocate(&self) -> StreamId {
        StreamId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Reset the counter back to 1
    pub fn reset(&self) {
        self.next.store(1, Ordering::Relaxed);
    }
}

impl Default for StreamIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
