/*!
 * Synchronization Configuration
 *
 * Construction parameters for the expiring semaphore
 */

use crate::core::errors::{SemaphoreError, SemaphoreResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Expiring semaphore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreConfig {
    /// Permits available immediately
    pub initial_permits: usize,
    /// Ceiling on available plus leased permits
    pub max_permits: usize,
    /// Lease length, measured from acquisition
    pub release_after: Duration,
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            initial_permits: 1,
            max_permits: 1,
            release_after: Duration::from_secs(1),
        }
    }
}

impl SemaphoreConfig {
    pub const fn new(initial_permits: usize, max_permits: usize, release_after: Duration) -> Self {
        Self {
            initial_permits,
            max_permits,
            release_after,
        }
    }

    /// Every permit available up front
    pub const fn full(permits: usize, release_after: Duration) -> Self {
        Self::new(permits, permits, release_after)
    }

    pub fn validate(&self) -> SemaphoreResult<()> {
        if self.max_permits == 0 {
            return Err(SemaphoreError::InvalidConfig(
                "max_permits must be at least 1".into(),
            ));
        }
        if self.max_permits > Semaphore::MAX_PERMITS {
            return Err(SemaphoreError::InvalidConfig(format!(
                "max_permits {} exceeds {}",
                self.max_permits,
                Semaphore::MAX_PERMITS
            )));
        }
        if self.initial_permits > self.max_permits {
            return Err(SemaphoreError::InvalidConfig(format!(
                "initial_permits {} exceeds max_permits {}",
                self.initial_permits, self.max_permits
            )));
        }
        Ok(())
    }
}
