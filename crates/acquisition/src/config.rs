//! Acquisition Configuration

use crate::AcquisitionError;
use sample_pool::{DEFAULT_POOL_SIZE, DEFAULT_SAMPLE_SIZE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Configuration for an acquisition engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Number of pre-allocated sample buffers
    pub pool_size: usize,
    /// Bytes per sample record
    pub sample_size: usize,
    /// Initial timer period in nanoseconds
    pub period_ns: u64,
    /// Upper bound on the wait for an in-flight transfer during detach
    pub teardown_timeout_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
            period_ns: 1_000_000, // 1 kHz
            teardown_timeout_ms: 500,
        }
    }
}

impl AcquisitionConfig {
    /// Check the configuration before attaching
    pub fn validate(&self) -> Result<(), AcquisitionError> {
        if self.pool_size == 0 {
            return Err(AcquisitionError::InvalidArgument("pool_size must be > 0".into()));
        }
        if self.sample_size == 0 {
            return Err(AcquisitionError::InvalidArgument("sample_size must be > 0".into()));
        }
        if self.period_ns == 0 {
            return Err(AcquisitionError::InvalidArgument("period_ns must be > 0".into()));
        }
        Ok(())
    }

    /// Timer period
    pub fn period(&self) -> Duration {
        Duration::from_nanos(self.period_ns)
    }

    /// Teardown wait bound
    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }
}

/// Build a period from signed seconds and unsigned nanoseconds.
///
/// The parts are summed as `secs * 1e9 + nsecs`, so a negative `secs` may be
/// offset by a large `nsecs`. The total must be positive and fit in a
/// `u64` nanosecond count.
pub fn period_from_parts(secs: i64, nsecs: u64) -> Result<Duration, AcquisitionError> {
    let total = i128::from(secs) * NANOS_PER_SEC + i128::from(nsecs);
    if total <= 0 {
        return Err(AcquisitionError::InvalidArgument(format!(
            "period {}s {}ns is not positive",
            secs, nsecs
        )));
    }
    let nanos = u64::try_from(total).map_err(|_| {
        AcquisitionError::InvalidArgument(format!("period {}s {}ns is too long", secs, nsecs))
    })?;
    Ok(Duration::from_nanos(nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = AcquisitionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.period(), Duration::from_millis(1));
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.sample_size, 24);
    }

    #[test]
    fn test_zero_period_rejected() {
        let config = AcquisitionConfig {
            period_ns: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AcquisitionError::InvalidArgument(_))));
    }

    #[test]
    fn test_period_from_parts() {
        assert_eq!(period_from_parts(0, 10_000_000).unwrap(), Duration::from_millis(10));
        assert_eq!(period_from_parts(2, 500).unwrap(), Duration::from_nanos(2_000_000_500));
        // Negative seconds offset by nanoseconds
        assert_eq!(period_from_parts(-1, 1_500_000_000).unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_non_positive_period_rejected() {
        assert!(period_from_parts(0, 0).is_err());
        assert!(period_from_parts(-1, 0).is_err());
        assert!(period_from_parts(-2, 1_000_000_000).is_err());
        assert!(period_from_parts(i64::MAX, u64::MAX).is_err());
    }
}
