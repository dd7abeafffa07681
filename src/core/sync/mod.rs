/*!
 * Synchronization Primitives
 *
 * Small coordination primitives:
 * - `Trigger`: lock-free one-shot flag, one winner per arming
 * - `ExpiringSemaphore`: counting semaphore whose permits are time-boxed leases
 * - `CancellationSource`/`CancellationToken`: broadcast cancellation for async waits
 *
 * # Use Cases
 *
 * - **Trigger**: run-once cleanup, edge-triggered signals between threads
 * - **ExpiringSemaphore**: cap concurrent access for a bounded window even when
 *   a holder never releases explicitly
 */

mod cancellation;
mod config;
mod expiring_semaphore;
mod trigger;

pub use cancellation::{CancellationSource, CancellationToken};
pub use config::SemaphoreConfig;
pub use expiring_semaphore::{ExpiringPermit, ExpiringSemaphore};
pub use trigger::Trigger;
