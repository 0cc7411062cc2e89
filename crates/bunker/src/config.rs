//! Backend configuration.

/// What the intake pump does when the work queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Discard the arriving event and log it.
    #[default]
    DropNewest,
    /// Wait for room. Back-pressure reaches the transport subscription.
    Block,
}

/// Configuration for the [`Backend`](crate::Backend).
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Capacity of the queue between the subscription and the handlers.
    pub queue_capacity: usize,
    /// Behavior when the queue is full.
    pub overflow: OverflowPolicy,
    /// Check id and signature of inbound transport events before decoding.
    pub verify_inbound: bool,
    /// Answer unknown methods with an error reply instead of dropping them.
    pub reply_unknown_methods: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            overflow: OverflowPolicy::DropNewest,
            verify_inbound: true,
            reply_unknown_methods: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.overflow, OverflowPolicy::DropNewest);
        assert!(config.verify_inbound);
        assert!(!config.reply_unknown_methods);
    }
}
