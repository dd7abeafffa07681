/*!
 * Canvas Primitives Library
 * Circular buffers and small concurrency primitives
 */

pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::core::data_structures::{
    BufferConfig, CircularBuffer, ConcurrentCircularBuffer, InvalidAccess,
};
pub use crate::core::errors::*;
pub use crate::core::guard::{DisposableWrapper, Guard, GuardError};
pub use crate::core::sync::{
    CancellationSource, CancellationToken, ExpiringPermit, ExpiringSemaphore, SemaphoreConfig,
    Trigger,
};
pub use monitoring::init_tracing;
