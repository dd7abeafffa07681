/*!
 * Core Module
 * Buffers, synchronization primitives, guards, and error handling
 */

pub mod data_structures;
pub mod errors;
pub mod guard;
pub mod sync;

// Re-export for convenience
pub use data_structures::{BufferConfig, CircularBuffer, ConcurrentCircularBuffer, InvalidAccess};
pub use errors::*;
pub use guard::{DisposableWrapper, Guard, GuardMetadata, GuardResult};
pub use sync::{
    CancellationSource, CancellationToken, ExpiringPermit, ExpiringSemaphore, SemaphoreConfig,
    Trigger,
};
