//! Session configuration

use std::time::Duration;

/// Tunables for one project session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on one provider round trip; a timeout renders as the
    /// assistant's error-notice reply
    pub provider_timeout: Duration,
    /// Capacity of the per-connection bus channel
    pub bus_capacity: usize,
    /// Capacity of the sandbox output sink channel
    pub sandbox_output_capacity: usize,
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a provider timeout
    #[inline]
    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// With a bus channel capacity
    #[inline]
    #[must_use]
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// With a sandbox output capacity
    #[inline]
    #[must_use]
    pub fn with_sandbox_output_capacity(mut self, capacity: usize) -> Self {
        self.sandbox_output_capacity = capacity;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(30),
            bus_capacity: 64,
            sandbox_output_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::new();
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        assert_eq!(config.bus_capacity, 64);
    }

    #[test]
    fn builders() {
        let config = SessionConfig::new()
            .with_provider_timeout(Duration::from_secs(5))
            .with_bus_capacity(8);
        assert_eq!(config.provider_timeout, Duration::from_secs(5));
        assert_eq!(config.bus_capacity, 8);
    }
}
