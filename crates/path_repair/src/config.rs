//! Repair engine configuration types and defaults.

use std::time::Duration;

/// Timing and locking parameters for the resolver and health monitor.
#[derive(Debug, Clone)]
pub struct RepairConfig {
    /// Delay before the first health sweep
    pub initial_delay: Duration,

    /// Period between the starts of two health sweeps
    pub check_interval: Duration,

    /// How long `stop()` waits for an in-flight sweep before aborting it
    pub shutdown_grace: Duration,

    /// Upper bound on a single remote validation call
    pub validation_timeout: Duration,

    /// Age after which a cached path is checked again by the monitor
    pub revalidate_after: Duration,

    /// Serialize resolutions of the same server + category
    pub serialize_per_key: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(60),
            check_interval: Duration::from_secs(30 * 60),
            shutdown_grace: Duration::from_secs(10),
            validation_timeout: Duration::from_secs(15),
            revalidate_after: Duration::from_secs(30 * 60),
            serialize_per_key: true,
        }
    }
}

impl RepairConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.check_interval.is_zero() {
            return Err("Check interval must be greater than zero".to_string());
        }
        if self.validation_timeout.is_zero() {
            return Err("Validation timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}
