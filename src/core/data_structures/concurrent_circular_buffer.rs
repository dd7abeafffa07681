/*!
 * Concurrent Circular Buffer
 *
 * The circular buffer behind a single parking_lot mutex, with a condvar so
 * consumers can block until a producer enqueues.
 *
 * # Guarantees
 *
 * - Every operation holds the lock for its full duration, resize included
 * - `dequeue()` is the only call that parks; it releases the lock while parked
 * - No wake ordering among blocked consumers: `notify_one` wakes *some* waiter
 */

use super::circular_buffer::{invalid_access, CircularBuffer};
use super::config::{BufferConfig, InvalidAccess};
use crate::core::errors::{BufferError, BufferResult};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::trace;

/// Thread-safe growable FIFO with blocking dequeue
///
/// # Example
///
/// ```
/// use canvas_primitives::ConcurrentCircularBuffer;
/// use std::sync::Arc;
/// use std::thread;
///
/// let buffer = Arc::new(ConcurrentCircularBuffer::with_capacity(4));
/// let producer = {
///     let buffer = buffer.clone();
///     thread::spawn(move || buffer.enqueue(42))
/// };
///
/// // Parks until the producer has enqueued
/// assert_eq!(buffer.dequeue(), 42);
/// producer.join().unwrap();
/// ```
pub struct ConcurrentCircularBuffer<T> {
    state: Mutex<CircularBuffer<T>>,
    available: Condvar,
}

impl<T> ConcurrentCircularBuffer<T> {
    /// Create a buffer; `capacity` is rounded up to the next power of two
    pub fn new(capacity: usize, on_invalid_access: InvalidAccess) -> Self {
        Self::from_buffer(CircularBuffer::new(capacity, on_invalid_access))
    }

    /// Create a buffer that returns `T::default()` on invalid non-blocking access
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, InvalidAccess::ReturnDefault)
    }

    pub fn from_config(config: &BufferConfig) -> Self {
        Self::from_buffer(CircularBuffer::from_config(config))
    }

    /// Take ownership of an existing single-threaded buffer
    pub fn from_buffer(buffer: CircularBuffer<T>) -> Self {
        Self {
            state: Mutex::new(buffer),
            available: Condvar::new(),
        }
    }

    /// Append an item and wake one blocked consumer
    pub fn enqueue(&self, item: T) {
        let mut state = self.state.lock();
        state.enqueue(item);
        self.available.notify_one();
    }

    /// Remove the oldest item, parking until one is available
    pub fn dequeue(&self) -> T {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.try_dequeue() {
                return item;
            }
            trace!("concurrent buffer empty, waiting for producer");
            self.available.wait(&mut state);
        }
    }

    /// Like [`dequeue`](Self::dequeue) but gives up after `timeout`
    ///
    /// # Errors
    ///
    /// `BufferError::TimedOut` if nothing was enqueued in time.
    pub fn dequeue_timeout(&self, timeout: Duration) -> BufferResult<T> {
        let mut state = self.state.lock();
        if let Some(item) = state.try_dequeue() {
            return Ok(item);
        }

        // a timeout past the end of the clock waits like `dequeue`
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            drop(state);
            return Ok(self.dequeue());
        };

        loop {
            if self.available.wait_until(&mut state, deadline).timed_out() {
                // a producer may have slipped in right at the deadline
                return state.try_dequeue().ok_or(BufferError::TimedOut {
                    waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            if let Some(item) = state.try_dequeue() {
                return Ok(item);
            }
        }
    }

    /// Number of live elements
    ///
    /// Only a snapshot: another thread may change it before the caller acts on it.
    pub fn count(&self) -> usize {
        self.state.lock().count()
    }

    /// Snapshot emptiness check; not a race-free precondition for `dequeue`
    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity()
    }

    pub fn policy(&self) -> InvalidAccess {
        self.state.lock().policy()
    }

    /// Reset to empty, optionally dropping every stored value now
    pub fn clear(&self, zero_contents: bool) {
        self.state.lock().clear(zero_contents);
    }

    /// Recover the single-threaded buffer
    pub fn into_inner(self) -> CircularBuffer<T> {
        self.state.into_inner()
    }
}

impl<T: Default> ConcurrentCircularBuffer<T> {
    /// Non-blocking dequeue governed by the invalid-access policy
    pub fn try_dequeue(&self) -> BufferResult<T> {
        self.state.lock().dequeue()
    }
}

impl<T: Clone + Default> ConcurrentCircularBuffer<T> {
    pub fn peek(&self) -> BufferResult<T> {
        self.state.lock().peek()
    }

    /// Copy of the `index`-th oldest item
    pub fn at(&self, index: usize) -> BufferResult<T> {
        let state = self.state.lock();
        match state.get(index) {
            Some(item) => Ok(item.clone()),
            None => invalid_access(
                state.policy(),
                BufferError::IndexOutOfRange {
                    index,
                    count: state.count(),
                },
            ),
        }
    }
}

impl<T: Clone> ConcurrentCircularBuffer<T> {
    /// Copy of the live elements, oldest first, taken under the lock
    pub fn snapshot(&self) -> Vec<T> {
        self.state.lock().iter().cloned().collect()
    }

    /// Iterate a snapshot; the lock is not held while the caller iterates
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.snapshot().into_iter()
    }
}

impl<T: Clone> IntoIterator for &ConcurrentCircularBuffer<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Default for ConcurrentCircularBuffer<T> {
    fn default() -> Self {
        Self::from_buffer(CircularBuffer::default())
    }
}

impl<T> From<CircularBuffer<T>> for ConcurrentCircularBuffer<T> {
    fn from(buffer: CircularBuffer<T>) -> Self {
        Self::from_buffer(buffer)
    }
}

impl<T: fmt::Debug> fmt::Debug for ConcurrentCircularBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_lock() {
            Some(state) => f
                .debug_struct("ConcurrentCircularBuffer")
                .field("state", &*state)
                .finish(),
            None => f
                .debug_struct("ConcurrentCircularBuffer")
                .field("state", &"<locked>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_blocking_dequeue_wakes_on_enqueue() {
        let buffer = Arc::new(ConcurrentCircularBuffer::<u64>::with_capacity(2));
        let consumer = {
            let buffer = buffer.clone();
            thread::spawn(move || buffer.dequeue())
        };

        // Give consumer time to park
        thread::sleep(Duration::from_millis(50));
        buffer.enqueue(7);

        assert_eq!(consumer.join().unwrap(), 7);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_dequeue_timeout_elapses() {
        let buffer = ConcurrentCircularBuffer::<u64>::with_capacity(2);
        let start = Instant::now();

        let result = buffer.dequeue_timeout(Duration::from_millis(50));

        assert_eq!(result, Err(BufferError::TimedOut { waited_ms: 50 }));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_dequeue_timeout_unbounded_duration() {
        let buffer = Arc::new(ConcurrentCircularBuffer::<u64>::with_capacity(2));
        buffer.enqueue(1);
        assert_eq!(buffer.dequeue_timeout(Duration::MAX), Ok(1));

        let consumer = {
            let buffer = buffer.clone();
            thread::spawn(move || buffer.dequeue_timeout(Duration::MAX))
        };
        thread::sleep(Duration::from_millis(20));
        buffer.enqueue(2);

        assert_eq!(consumer.join().unwrap(), Ok(2));
    }

    #[test]
    fn test_try_dequeue_uses_policy() {
        let lenient = ConcurrentCircularBuffer::<u8>::with_capacity(1);
        assert_eq!(lenient.try_dequeue(), Ok(0));

        let strict = ConcurrentCircularBuffer::<u8>::new(1, InvalidAccess::Fail);
        assert_eq!(strict.try_dequeue(), Err(BufferError::Empty));
        assert_eq!(strict.peek(), Err(BufferError::Empty));
        assert_eq!(
            strict.at(0),
            Err(BufferError::IndexOutOfRange { index: 0, count: 0 })
        );
    }

    #[test]
    fn test_snapshot_iteration() {
        let buffer = ConcurrentCircularBuffer::with_capacity(2);
        for i in 0..5 {
            buffer.enqueue(i);
        }

        let seen: Vec<_> = buffer.iter().collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        // snapshot does not consume
        assert_eq!(buffer.count(), 5);
        assert_eq!(buffer.capacity(), 8);
    }
}
