/*!
 * Circular Buffer
 *
 * Growable FIFO ring over a power-of-two backing store.
 *
 * # Performance
 *
 * - Amortized O(1) enqueue, O(1) dequeue/peek/index
 * - Index wrap is a bitmask (`index & (capacity - 1)`), never a division
 * - Growth doubles the store, so every resize keeps the power-of-two invariant
 *
 * # Concurrency
 *
 * None. A `CircularBuffer` has a single owner; see
 * [`ConcurrentCircularBuffer`](super::ConcurrentCircularBuffer) for the locked variant.
 */

use super::config::{effective_capacity, BufferConfig, InvalidAccess};
use crate::core::errors::{BufferError, BufferResult};
use std::fmt;
use std::iter::FusedIterator;
use std::slice;
use tracing::{debug, trace};

/// Growable FIFO ring buffer
///
/// # Example
///
/// ```
/// use canvas_primitives::{CircularBuffer, InvalidAccess};
///
/// let mut buffer = CircularBuffer::new(4, InvalidAccess::Fail);
/// for i in 1..=5 {
///     buffer.enqueue(i);
/// }
///
/// assert_eq!(buffer.capacity(), 8);
/// assert_eq!(buffer.dequeue(), Ok(1));
/// assert_eq!(buffer.count(), 4);
/// ```
#[derive(Clone)]
pub struct CircularBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    count: usize,
    policy: InvalidAccess,
}

fn allocate<T>(capacity: usize) -> Box<[Option<T>]> {
    debug_assert!(capacity.is_power_of_two());
    std::iter::repeat_with(|| None).take(capacity).collect()
}

/// Resolve an invalid access according to the buffer's policy
#[inline]
pub(crate) fn invalid_access<T: Default>(policy: InvalidAccess, error: BufferError) -> BufferResult<T> {
    match policy {
        InvalidAccess::ReturnDefault => Ok(T::default()),
        InvalidAccess::Fail => Err(error),
    }
}

impl<T> CircularBuffer<T> {
    /// Create a buffer; `capacity` is rounded up to the next power of two
    pub fn new(capacity: usize, on_invalid_access: InvalidAccess) -> Self {
        Self {
            slots: allocate(effective_capacity(capacity)),
            head: 0,
            tail: 0,
            count: 0,
            policy: on_invalid_access,
        }
    }

    /// Create a buffer that returns `T::default()` on invalid access
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, InvalidAccess::ReturnDefault)
    }

    /// Create a buffer from configuration
    pub fn from_config(config: &BufferConfig) -> Self {
        Self::new(config.capacity, config.on_invalid_access)
    }

    /// Append an item at the tail, growing the store if full
    pub fn enqueue(&mut self, item: T) {
        if self.count == self.slots.len() {
            self.grow();
        }

        self.slots[self.tail] = Some(item);
        self.tail = self.wrap(self.tail + 1);
        self.count += 1;
    }

    /// Remove the oldest item, or `None` when empty
    ///
    /// Ignores the invalid-access policy.
    pub fn try_dequeue(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }

        // take() leaves the vacated slot empty so no stale value is kept alive
        let item = self.slots[self.head].take();
        self.head = self.wrap(self.head + 1);
        self.count -= 1;
        item
    }

    /// Borrow the oldest item without removing it
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Borrow the `index`-th oldest item; bounds are checked against count, not capacity
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.count {
            self.slots[self.wrap(self.head + index)].as_ref()
        } else {
            None
        }
    }

    /// Reset to empty
    ///
    /// With `zero_contents`, every slot is emptied so held values are dropped now.
    /// Otherwise stale values stay in place until overwritten.
    pub fn clear(&mut self, zero_contents: bool) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;

        if zero_contents {
            self.slots.iter_mut().for_each(|slot| *slot = None);
            trace!(capacity = self.slots.len(), "circular buffer zeroed");
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of live elements
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Size of the backing store (always a power of two)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn policy(&self) -> InvalidAccess {
        self.policy
    }

    /// Iterate oldest to newest without consuming
    pub fn iter(&self) -> Iter<'_, T> {
        let (head_side, wrapped) = self.live_runs();
        Iter {
            head_side: head_side.iter(),
            wrapped: wrapped.iter(),
        }
    }

    /// Live region as two contiguous runs: `[head, end)` then `[0, tail)`
    fn live_runs(&self) -> (&[Option<T>], &[Option<T>]) {
        let first_run = (self.slots.len() - self.head).min(self.count);
        (
            &self.slots[self.head..self.head + first_run],
            &self.slots[..self.count - first_run],
        )
    }

    /// Double the backing store, moving live elements to start at index 0
    fn grow(&mut self) {
        let old_capacity = self.slots.len();
        let mut resized = allocate(old_capacity * 2);

        let first_run = (old_capacity - self.head).min(self.count);
        let second_run = self.count - first_run;
        let (wrapped, head_side) = self.slots.split_at_mut(self.head);

        let live = head_side[..first_run]
            .iter_mut()
            .chain(wrapped[..second_run].iter_mut());
        for (dst, src) in resized.iter_mut().zip(live) {
            *dst = src.take();
        }

        self.slots = resized;
        self.head = 0;
        self.tail = self.count;

        debug!(
            old_capacity,
            new_capacity = self.slots.len(),
            count = self.count,
            "circular buffer grew"
        );
    }

    #[inline(always)]
    fn wrap(&self, index: usize) -> usize {
        index & (self.slots.len() - 1)
    }
}

impl<T: Default> CircularBuffer<T> {
    /// Remove the oldest item
    ///
    /// # Errors
    ///
    /// `BufferError::Empty` when empty and the policy is `Fail`;
    /// under `ReturnDefault` an empty buffer yields `T::default()`.
    pub fn dequeue(&mut self) -> BufferResult<T> {
        match self.try_dequeue() {
            Some(item) => Ok(item),
            None => invalid_access(self.policy, BufferError::Empty),
        }
    }
}

impl<T: Clone + Default> CircularBuffer<T> {
    /// Copy of the oldest item, same empty policy as [`dequeue`](Self::dequeue)
    pub fn peek(&self) -> BufferResult<T> {
        match self.front() {
            Some(item) => Ok(item.clone()),
            None => invalid_access(self.policy, BufferError::Empty),
        }
    }

    /// Copy of the `index`-th oldest item
    ///
    /// # Errors
    ///
    /// `BufferError::IndexOutOfRange` when `index >= count` and the policy is `Fail`.
    pub fn at(&self, index: usize) -> BufferResult<T> {
        match self.get(index) {
            Some(item) => Ok(item.clone()),
            None => invalid_access(
                self.policy,
                BufferError::IndexOutOfRange {
                    index,
                    count: self.count,
                },
            ),
        }
    }
}

impl<T> Default for CircularBuffer<T> {
    fn default() -> Self {
        Self::from_config(&BufferConfig::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularBuffer")
            .field("capacity", &self.capacity())
            .field("count", &self.count)
            .field("policy", &self.policy)
            .field("items", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<T> Extend<T> for CircularBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.enqueue(item);
        }
    }
}

impl<T> FromIterator<T> for CircularBuffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut buffer = Self::with_capacity(iter.size_hint().0);
        buffer.extend(iter);
        buffer
    }
}

/// Borrowing iterator, oldest to newest
///
/// Finite and restartable: call [`CircularBuffer::iter`] again to walk from the head.
#[derive(Clone)]
pub struct Iter<'a, T> {
    head_side: slice::Iter<'a, Option<T>>,
    wrapped: slice::Iter<'a, Option<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.head_side
            .next()
            .or_else(|| self.wrapped.next())
            .and_then(Option::as_ref)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.head_side.len() + self.wrapped.len();
        (len, Some(len))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.wrapped
            .next_back()
            .or_else(|| self.head_side.next_back())
            .and_then(Option::as_ref)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a CircularBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator that drains the buffer in FIFO order
pub struct IntoIter<T>(CircularBuffer<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.try_dequeue()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.0.count, Some(self.0.count))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}
impl<T> FusedIterator for IntoIter<T> {}

impl<T> IntoIterator for CircularBuffer<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Buffer whose live region straddles the end of the store
    fn wrapped_buffer() -> CircularBuffer<u32> {
        let mut buffer = CircularBuffer::new(4, InvalidAccess::Fail);
        buffer.extend([0, 0, 0, 1]);
        for _ in 0..3 {
            buffer.try_dequeue();
        }
        buffer.extend([2, 3, 4]);
        buffer
    }

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        assert_eq!(CircularBuffer::<u8>::with_capacity(0).capacity(), 1);
        assert_eq!(CircularBuffer::<u8>::with_capacity(5).capacity(), 8);
        assert_eq!(CircularBuffer::<u8>::with_capacity(64).capacity(), 64);
    }

    #[test]
    fn test_growth_preserves_order() {
        let mut buffer = CircularBuffer::new(4, InvalidAccess::Fail);
        for i in 1..=5 {
            buffer.enqueue(i);
        }

        assert_eq!(buffer.capacity(), 8);
        for expected in 1..=4 {
            assert_eq!(buffer.dequeue(), Ok(expected));
        }
        assert_eq!(buffer.count(), 1);
    }

    #[test]
    fn test_growth_from_wrapped_state() {
        let mut buffer = wrapped_buffer();
        assert_eq!(buffer.capacity(), 4);
        assert_eq!(buffer.head, 3);

        buffer.enqueue(5);
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.head, 0);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_iter_wrapped_both_directions() {
        let buffer = wrapped_buffer();
        let forward: Vec<_> = buffer.iter().copied().collect();
        let backward: Vec<_> = buffer.iter().rev().copied().collect();

        assert_eq!(forward, vec![1, 2, 3, 4]);
        assert_eq!(backward, vec![4, 3, 2, 1]);
        assert_eq!(buffer.iter().len(), 4);
    }

    #[test]
    fn test_iter_is_restartable() {
        let buffer: CircularBuffer<_> = (0..3).collect();
        assert_eq!(buffer.iter().count(), 3);
        assert_eq!(buffer.iter().count(), 3);
    }

    #[test]
    fn test_return_default_policy() {
        let mut buffer = CircularBuffer::<i32>::with_capacity(2);
        assert_eq!(buffer.dequeue(), Ok(0));
        assert_eq!(buffer.peek(), Ok(0));
        assert_eq!(buffer.at(3), Ok(0));
        assert_eq!(buffer.count(), 0);
    }

    #[test]
    fn test_fail_policy() {
        let mut buffer = CircularBuffer::<i32>::new(2, InvalidAccess::Fail);
        assert_eq!(buffer.dequeue(), Err(BufferError::Empty));
        assert_eq!(buffer.peek(), Err(BufferError::Empty));

        buffer.enqueue(9);
        assert_eq!(
            buffer.at(1),
            Err(BufferError::IndexOutOfRange { index: 1, count: 1 })
        );
        assert_eq!(buffer.at(0), Ok(9));
    }

    #[test]
    fn test_dequeue_releases_slot() {
        let value = std::rc::Rc::new(());
        let mut buffer = CircularBuffer::with_capacity(2);
        buffer.enqueue(value.clone());
        assert_eq!(std::rc::Rc::strong_count(&value), 2);

        drop(buffer.try_dequeue());
        assert_eq!(std::rc::Rc::strong_count(&value), 1);
    }

    #[test]
    fn test_clear_with_and_without_zeroing() {
        let value = std::rc::Rc::new(());
        let mut buffer = CircularBuffer::with_capacity(4);
        buffer.extend([value.clone(), value.clone()]);

        buffer.clear(false);
        assert!(buffer.is_empty());
        // stale slots still hold their values
        assert_eq!(std::rc::Rc::strong_count(&value), 3);

        buffer.clear(true);
        assert_eq!(std::rc::Rc::strong_count(&value), 1);
        assert_eq!(buffer.capacity(), 4);
    }

    #[test]
    fn test_into_iter_drains_fifo() {
        let buffer = wrapped_buffer();
        let drained: Vec<_> = buffer.into_iter().collect();
        assert_eq!(drained, vec![1, 2, 3, 4]);
    }
}
