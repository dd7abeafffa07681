/*!
 * Buffer Configuration
 *
 * Construction-time policy for circular buffers
 */

use serde::{Deserialize, Serialize};

/// What a buffer does when asked for an element it does not have
///
/// Applies to dequeue/peek on an empty buffer and to indexed reads
/// outside `[0, count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidAccess {
    /// Hand back `T::default()`
    #[default]
    ReturnDefault,
    /// Return a [`BufferError`](crate::BufferError)
    Fail,
}

/// Circular buffer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Requested initial capacity, rounded up to a power of two
    pub capacity: usize,
    /// Policy for empty or out-of-range access
    pub on_invalid_access: InvalidAccess,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            on_invalid_access: InvalidAccess::ReturnDefault,
        }
    }
}

impl BufferConfig {
    /// Buffer that reports invalid access as an error
    pub const fn strict(capacity: usize) -> Self {
        Self {
            capacity,
            on_invalid_access: InvalidAccess::Fail,
        }
    }

    /// Buffer that answers invalid access with `T::default()`
    pub const fn lenient(capacity: usize) -> Self {
        Self {
            capacity,
            on_invalid_access: InvalidAccess::ReturnDefault,
        }
    }

    /// Backing store size actually allocated for this configuration
    #[inline]
    pub fn effective_capacity(&self) -> usize {
        effective_capacity(self.capacity)
    }
}

/// Smallest power of two `>= max(requested, 1)`
#[inline]
pub fn effective_capacity(requested: usize) -> usize {
    requested.max(1).next_power_of_two()
}
