/*!
 * Data Structures
 *
 * Power-of-two circular buffers:
 * - `CircularBuffer`: single-owner, zero synchronization cost
 * - `ConcurrentCircularBuffer`: mutex-guarded, blocking dequeue
 *
 * # Performance
 *
 * - Amortized O(1) enqueue with doubling growth (never shrinks)
 * - Bitmask index wrap; capacity stays a power of two across every resize
 *
 * # Use Cases
 *
 * - **CircularBuffer**: per-frame event queues, history windows
 * - **ConcurrentCircularBuffer**: producer/consumer hand-off between threads
 */

mod circular_buffer;
mod concurrent_circular_buffer;
mod config;

pub use circular_buffer::{CircularBuffer, IntoIter, Iter};
pub use concurrent_circular_buffer::ConcurrentCircularBuffer;
pub use config::{effective_capacity, BufferConfig, InvalidAccess};
