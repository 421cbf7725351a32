//! Gateway configuration

use std::time::Duration;

/// Gateway-wide configuration options
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Samples retained per channel before oldest-first eviction
    pub buffer_capacity: usize,

    /// Delay between interest reaching zero and physical teardown,
    /// absorbing rapid resubscribe churn
    pub teardown_grace: Duration,

    /// Upper bound on one upstream poll request
    pub poll_timeout: Duration,

    /// Capacity of the adapter update queue feeding the buffers
    pub update_queue_capacity: usize,

    /// Capacity of each stream's output event queue; consumers that lag
    /// further than this miss events (best-effort delivery)
    pub event_queue_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 16,
            teardown_grace: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(2),
            update_queue_capacity: 1024,
            event_queue_capacity: 64,
        }
    }
}

impl GatewayConfig {
    /// Set the per-channel buffer capacity (at least 1)
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    /// Set the teardown grace delay
    pub fn teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace = grace;
        self
    }

    /// Set the poll timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the adapter update queue capacity
    pub fn update_queue_capacity(mut self, capacity: usize) -> Self {
        self.update_queue_capacity = capacity.max(1);
        self
    }

    /// Set the per-stream event queue capacity
    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();

        assert_eq!(config.buffer_capacity, 16);
        assert_eq!(config.teardown_grace, Duration::from_secs(5));
        assert_eq!(config.poll_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_builder_chaining() {
        let config = GatewayConfig::default()
            .buffer_capacity(128)
            .teardown_grace(Duration::from_millis(250))
            .poll_timeout(Duration::from_millis(500))
            .update_queue_capacity(64)
            .event_queue_capacity(8);

        assert_eq!(config.buffer_capacity, 128);
        assert_eq!(config.teardown_grace, Duration::from_millis(250));
        assert_eq!(config.poll_timeout, Duration::from_millis(500));
        assert_eq!(config.update_queue_capacity, 64);
        assert_eq!(config.event_queue_capacity, 8);
    }

    #[test]
    fn test_capacities_floored_at_one() {
        let config = GatewayConfig::default().buffer_capacity(0).event_queue_capacity(0);

        assert_eq!(config.buffer_capacity, 1);
        assert_eq!(config.event_queue_capacity, 1);
    }
}
