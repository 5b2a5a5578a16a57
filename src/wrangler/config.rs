use crate::core::{Result, TopoError};
use std::time::Duration;

/// Wrangler configuration
#[derive(Debug, Clone)]
pub struct WranglerConfig {
    /// How long to wait for a busy shard lock before giving up
    pub lock_timeout: Duration,
}

impl Default for WranglerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WranglerConfig {
    pub fn new() -> Self {
        Self {
            lock_timeout: Duration::from_secs(30),
        }
    }

    /// Set lock timeout
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.lock_timeout.is_zero() {
            return Err(TopoError::InvalidArgument(
                "lock timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WranglerConfig::default();
        assert_eq!(config.lock_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = WranglerConfig::new().lock_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(TopoError::InvalidArgument(_))
        ));
    }
}
