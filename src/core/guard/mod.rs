/*!
 * RAII Resource Guards
 *
 * Guards own a resource and hand it back exactly once, either explicitly
 * through [`Guard::release`] or implicitly on drop.
 *
 * ## Guard Types
 *
 * - **DisposableWrapper**: any value plus a cleanup action that runs once
 * - **ExpiringPermit**: a leased semaphore permit (see `core::sync`)
 *
 * ## Example
 *
 * ```rust
 * use canvas_primitives::core::guard::DisposableWrapper;
 *
 * let handle = DisposableWrapper::new(vec![1, 2, 3], |items| {
 *     println!("cleaning up {} items", items.len());
 * });
 * assert_eq!(handle.len(), 3);
 * // cleanup runs here, once
 * ```
 */

mod disposable;
mod traits;

pub use disposable::DisposableWrapper;
pub use traits::Guard;

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
        }
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
