//! Push engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Error, Result};

/// Timing configuration for the push engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// How long to wait for the peer to advertise the required capabilities
    pub max_wait_for_capabilities_ms: u64,

    /// Absolute bound on conflict recovery, armed at the first conflict
    pub conflicting_version_timeout_ms: u64,

    /// Capability sampling interval
    pub capability_poll_interval_ms: u64,

    /// Pause before re-acquiring a session after a conflict; 0 only yields to the runtime
    pub conflict_retry_delay_ms: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            max_wait_for_capabilities_ms: 120_000, // 2 minutes
            conflicting_version_timeout_ms: 30_000,
            capability_poll_interval_ms: 50,
            conflict_retry_delay_ms: 100,
        }
    }
}

impl PushConfig {
    /// Create a validated configuration with the two required deadlines
    pub fn new(max_wait_for_capabilities: Duration, conflicting_version_timeout: Duration) -> Result<Self> {
        let config = Self {
            max_wait_for_capabilities_ms: duration_ms(max_wait_for_capabilities),
            conflicting_version_timeout_ms: duration_ms(conflicting_version_timeout),
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid push config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.capability_poll_interval_ms = duration_ms(interval);
        self
    }

    pub fn with_conflict_retry_delay(mut self, delay: Duration) -> Self {
        self.conflict_retry_delay_ms = duration_ms(delay);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_wait_for_capabilities_ms == 0 {
            return Err(Error::Config("max_wait_for_capabilities_ms must be positive".into()));
        }
        if self.conflicting_version_timeout_ms == 0 {
            return Err(Error::Config("conflicting_version_timeout_ms must be positive".into()));
        }
        if self.capability_poll_interval_ms == 0 {
            return Err(Error::Config("capability_poll_interval_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn max_wait_for_capabilities(&self) -> Duration {
        Duration::from_millis(self.max_wait_for_capabilities_ms)
    }

    pub fn conflicting_version_timeout(&self) -> Duration {
        Duration::from_millis(self.conflicting_version_timeout_ms)
    }

    pub fn capability_poll_interval(&self) -> Duration {
        Duration::from_millis(self.capability_poll_interval_ms)
    }

    pub fn conflict_retry_delay(&self) -> Duration {
        Duration::from_millis(self.conflict_retry_delay_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
