//! Configuration for the fetch pipeline.

use std::time::Duration;

use super::http::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

/// Default maximum number of concurrent fetch workers.
pub const DEFAULT_MAX_WORKERS: usize = 20;

/// Configuration for the fetch scheduler and its HTTP workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Maximum number of live workers (minimum 1).
    pub max_workers: usize,

    /// Timeout for a single tile request.
    pub timeout: Duration,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    /// Set the maximum number of workers.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.max_workers, 20);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_builder() {
        let config = FetchConfig::default()
            .with_max_workers(4)
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("agent/2");
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "agent/2");
    }

    #[test]
    fn test_min_workers() {
        assert_eq!(FetchConfig::default().with_max_workers(0).max_workers, 1);
    }
}
